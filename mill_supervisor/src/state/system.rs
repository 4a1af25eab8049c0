//! System State Record.
//!
//! Operating state plus every transient field the run loop keeps. A reset
//! iteration replaces the whole record with defaults except for the
//! operating state.

use mill_common::supervisor::flags::{SpindleStopFlags, SuspendFlags};
use mill_common::supervisor::state::OperatingState;

use super::overrides::Overrides;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemState {
    state: OperatingState,
    /// Abort requested; the run loop returns to the sequencer.
    pub abort: bool,
    /// Hold / door / restore bookkeeping.
    pub suspend: SuspendFlags,
    /// A soft limit was violated during the current program.
    pub soft_limit: bool,
    /// The last probing cycle made contact.
    pub probe_succeeded: bool,
    /// Axes locked out of the current homing motion (one bit per axis).
    pub homing_axis_lock: u8,
    pub overrides: Overrides,
    pub spindle_stop_override: SpindleStopFlags,
    /// Status reports left before overrides are reported again.
    pub report_override_counter: u8,
    /// Status reports left before work offsets are reported again.
    pub report_wco_counter: u8,
}

impl SystemState {
    /// Fresh record in `state` with every other field at its default.
    pub const fn new(state: OperatingState) -> Self {
        Self {
            state,
            abort: false,
            suspend: SuspendFlags::empty(),
            soft_limit: false,
            probe_succeeded: false,
            homing_axis_lock: 0,
            overrides: Overrides::DEFAULT,
            spindle_stop_override: SpindleStopFlags::empty(),
            report_override_counter: 0,
            report_wco_counter: 0,
        }
    }

    #[inline]
    pub const fn state(&self) -> OperatingState {
        self.state
    }

    /// The single mutation point for the operating state.
    ///
    /// Returns the previous state.
    #[inline]
    pub fn set_operating_state(&mut self, state: OperatingState) -> OperatingState {
        core::mem::replace(&mut self.state, state)
    }

    /// Record for the next reset iteration: only the operating state
    /// carries over.
    pub fn begin_reset_iteration(&self) -> Self {
        Self::new(self.state)
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::new(OperatingState::default())
    }
}
