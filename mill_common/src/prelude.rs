//! Prelude module for common re-exports.
//!
//! ```rust
//! use mill_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::supervisor::config::{BootPolicy, PersistedSettings, SupervisorConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{AxisSteps, N_AXIS};

// ─── Supervisor State & Flags ───────────────────────────────────────
pub use crate::supervisor::flags::{
    AccessoryOverride, AlarmFlags, ExecState, MotionOverride, SpindleStopFlags, SuspendFlags,
};
pub use crate::supervisor::state::{AlarmCause, OperatingState, ProbeState};
