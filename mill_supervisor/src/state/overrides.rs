//! Feed, rapid and spindle override percentages.

use mill_common::consts::{
    DEFAULT_FEED_OVERRIDE, DEFAULT_RAPID_OVERRIDE, DEFAULT_SPINDLE_SPEED_OVERRIDE,
    FEED_OVERRIDE_COARSE_INCREMENT, FEED_OVERRIDE_FINE_INCREMENT, MAX_FEED_OVERRIDE,
    MAX_SPINDLE_SPEED_OVERRIDE, MIN_FEED_OVERRIDE, MIN_SPINDLE_SPEED_OVERRIDE,
    RAPID_OVERRIDE_LOW, RAPID_OVERRIDE_MEDIUM, SPINDLE_OVERRIDE_COARSE_INCREMENT,
    SPINDLE_OVERRIDE_FINE_INCREMENT,
};
use mill_common::supervisor::flags::{AccessoryOverride, MotionOverride};

/// Override percentages applied by the planner and spindle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overrides {
    /// Feed-rate override [%].
    pub feed: u8,
    /// Rapid-rate override [%].
    pub rapid: u8,
    /// Spindle-speed override [%].
    pub spindle: u8,
}

impl Overrides {
    /// All overrides at their compiled-in defaults (100%).
    pub const DEFAULT: Self = Self {
        feed: DEFAULT_FEED_OVERRIDE,
        rapid: DEFAULT_RAPID_OVERRIDE,
        spindle: DEFAULT_SPINDLE_SPEED_OVERRIDE,
    };

    /// Apply pending feed/rapid requests. Returns `true` if a value changed.
    ///
    /// Feed adjustments accumulate in bit order (reset first, then coarse,
    /// then fine) and clamp to the feed range. For rapid, the lowest
    /// requested level wins.
    pub fn apply_motion(&mut self, requests: MotionOverride) -> bool {
        let before = *self;

        let mut feed = i16::from(self.feed);
        if requests.contains(MotionOverride::FEED_RESET) {
            feed = i16::from(DEFAULT_FEED_OVERRIDE);
        }
        if requests.contains(MotionOverride::FEED_COARSE_PLUS) {
            feed += i16::from(FEED_OVERRIDE_COARSE_INCREMENT);
        }
        if requests.contains(MotionOverride::FEED_COARSE_MINUS) {
            feed -= i16::from(FEED_OVERRIDE_COARSE_INCREMENT);
        }
        if requests.contains(MotionOverride::FEED_FINE_PLUS) {
            feed += i16::from(FEED_OVERRIDE_FINE_INCREMENT);
        }
        if requests.contains(MotionOverride::FEED_FINE_MINUS) {
            feed -= i16::from(FEED_OVERRIDE_FINE_INCREMENT);
        }
        self.feed = clamp_percent(feed, MIN_FEED_OVERRIDE, MAX_FEED_OVERRIDE);

        if requests.contains(MotionOverride::RAPID_RESET) {
            self.rapid = DEFAULT_RAPID_OVERRIDE;
        }
        if requests.contains(MotionOverride::RAPID_MEDIUM) {
            self.rapid = RAPID_OVERRIDE_MEDIUM;
        }
        if requests.contains(MotionOverride::RAPID_LOW) {
            self.rapid = RAPID_OVERRIDE_LOW;
        }

        *self != before
    }

    /// Apply pending spindle speed requests. Returns `true` if changed.
    ///
    /// Stop and coolant toggles are not percentages and are ignored here.
    pub fn apply_spindle(&mut self, requests: AccessoryOverride) -> bool {
        let before = self.spindle;

        let mut spindle = i16::from(self.spindle);
        if requests.contains(AccessoryOverride::SPINDLE_RESET) {
            spindle = i16::from(DEFAULT_SPINDLE_SPEED_OVERRIDE);
        }
        if requests.contains(AccessoryOverride::SPINDLE_COARSE_PLUS) {
            spindle += i16::from(SPINDLE_OVERRIDE_COARSE_INCREMENT);
        }
        if requests.contains(AccessoryOverride::SPINDLE_COARSE_MINUS) {
            spindle -= i16::from(SPINDLE_OVERRIDE_COARSE_INCREMENT);
        }
        if requests.contains(AccessoryOverride::SPINDLE_FINE_PLUS) {
            spindle += i16::from(SPINDLE_OVERRIDE_FINE_INCREMENT);
        }
        if requests.contains(AccessoryOverride::SPINDLE_FINE_MINUS) {
            spindle -= i16::from(SPINDLE_OVERRIDE_FINE_INCREMENT);
        }
        self.spindle = clamp_percent(
            spindle,
            MIN_SPINDLE_SPEED_OVERRIDE,
            MAX_SPINDLE_SPEED_OVERRIDE,
        );

        self.spindle != before
    }
}

impl Default for Overrides {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[inline]
fn clamp_percent(value: i16, min: u8, max: u8) -> u8 {
    value.clamp(i16::from(min), i16::from(max)) as u8
}
