//! Boot policy, persisted settings and the supervisor configuration file.
//!
//! The boot policy is compiled in through Cargo features and may be
//! overridden by the `[policy]` table. Persisted settings are owned by the
//! settings store; the supervisor only reads them at boot.

use serde::{Deserialize, Serialize};

use super::state::OperatingState;
use crate::config::{ConfigError, SharedConfig};

/// Default foreground poll interval for the simulator [µs].
pub const POLL_INTERVAL_US_DEFAULT: u32 = 1000;

/// Default simulated step pulse interval [µs].
pub const STEP_INTERVAL_US_DEFAULT: u32 = 500;

// ─── Boot Policy ────────────────────────────────────────────────────

/// Power-up alarm policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootPolicy {
    /// Enter `Alarm` on every power-up or hard reset.
    #[serde(default = "compiled_force_alarm")]
    pub force_alarm_on_boot: bool,
    /// Enter `Alarm` on power-up when homing is enabled, so that a homing
    /// cycle (or an explicit unlock) is required before any motion.
    #[serde(default = "compiled_lock_until_homed")]
    pub lock_until_homed: bool,
}

const fn compiled_force_alarm() -> bool {
    cfg!(feature = "force-init-alarm")
}

const fn compiled_lock_until_homed() -> bool {
    cfg!(feature = "homing-init-lock")
}

impl BootPolicy {
    /// Policy selected by the `force-init-alarm` / `homing-init-lock` features.
    pub const fn compiled() -> Self {
        Self {
            force_alarm_on_boot: compiled_force_alarm(),
            lock_until_homed: compiled_lock_until_homed(),
        }
    }

    /// Operating state chosen once at cold boot.
    ///
    /// `Alarm` when the force policy is on, or when the lock policy is on
    /// and homing is enabled in the persisted settings. `Idle` otherwise.
    pub const fn initial_state(&self, settings: &PersistedSettings) -> OperatingState {
        if self.force_alarm_on_boot || (self.lock_until_homed && settings.homing_enabled) {
            OperatingState::Alarm
        } else {
            OperatingState::Idle
        }
    }
}

impl Default for BootPolicy {
    fn default() -> Self {
        Self::compiled()
    }
}

// ─── Persisted Settings ─────────────────────────────────────────────

/// Settings-store values consulted by the supervisor at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedSettings {
    /// Homing cycle enabled.
    #[serde(default)]
    pub homing_enabled: bool,
}

// ─── Simulation ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Foreground poll interval [µs].
    #[serde(default = "default_poll_interval")]
    pub poll_interval_us: u32,
    /// Interval between simulated step pulses [µs].
    #[serde(default = "default_step_interval")]
    pub step_interval_us: u32,
}

fn default_poll_interval() -> u32 {
    POLL_INTERVAL_US_DEFAULT
}

fn default_step_interval() -> u32 {
    STEP_INTERVAL_US_DEFAULT
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            poll_interval_us: POLL_INTERVAL_US_DEFAULT,
            step_interval_us: STEP_INTERVAL_US_DEFAULT,
        }
    }
}

// ─── Supervisor Config File ─────────────────────────────────────────

/// Top-level supervisor configuration.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "mill-sim-01"
///
/// [settings]
/// homing_enabled = true
///
/// [policy]
/// lock_until_homed = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub settings: PersistedSettings,
    #[serde(default)]
    pub policy: BootPolicy,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl SupervisorConfig {
    /// Validate the whole file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the shared section is
    /// invalid or a simulation interval is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.simulation.poll_interval_us == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.poll_interval_us must be > 0".to_string(),
            ));
        }
        if self.simulation.step_interval_us == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.step_interval_us must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
