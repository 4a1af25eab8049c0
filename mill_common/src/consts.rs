//! System-wide constants.

use static_assertions::const_assert;

/// Number of controlled axes (X, Y, Z).
pub const N_AXIS: usize = 3;

// Axis masks (homing lock, step bits) are one bit per axis in a `u8`.
const_assert!(N_AXIS > 0 && N_AXIS <= 8);

/// Position vector in step units, one entry per axis.
pub type AxisSteps = [i32; N_AXIS];

/// Default feed-rate override [%].
pub const DEFAULT_FEED_OVERRIDE: u8 = 100;
/// Default rapid-rate override [%].
pub const DEFAULT_RAPID_OVERRIDE: u8 = 100;
/// Default spindle-speed override [%].
pub const DEFAULT_SPINDLE_SPEED_OVERRIDE: u8 = 100;

/// Feed override bounds and increments [%].
pub const MAX_FEED_OVERRIDE: u8 = 200;
pub const MIN_FEED_OVERRIDE: u8 = 10;
pub const FEED_OVERRIDE_COARSE_INCREMENT: u8 = 10;
pub const FEED_OVERRIDE_FINE_INCREMENT: u8 = 1;

/// Rapid override levels [%]. Full speed is [`DEFAULT_RAPID_OVERRIDE`].
pub const RAPID_OVERRIDE_MEDIUM: u8 = 50;
pub const RAPID_OVERRIDE_LOW: u8 = 25;

/// Spindle override bounds and increments [%].
pub const MAX_SPINDLE_SPEED_OVERRIDE: u8 = 200;
pub const MIN_SPINDLE_SPEED_OVERRIDE: u8 = 10;
pub const SPINDLE_OVERRIDE_COARSE_INCREMENT: u8 = 10;
pub const SPINDLE_OVERRIDE_FINE_INCREMENT: u8 = 1;

const_assert!(MIN_FEED_OVERRIDE <= DEFAULT_FEED_OVERRIDE);
const_assert!(DEFAULT_FEED_OVERRIDE <= MAX_FEED_OVERRIDE);
const_assert!(MIN_SPINDLE_SPEED_OVERRIDE <= DEFAULT_SPINDLE_SPEED_OVERRIDE);
const_assert!(DEFAULT_SPINDLE_SPEED_OVERRIDE <= MAX_SPINDLE_SPEED_OVERRIDE);
