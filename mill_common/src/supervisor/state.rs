//! State enums for the supervisor.
//!
//! All enums use `#[repr(u8)]` so they can live in a single atomic byte
//! when the interrupt domain needs to observe them.

use serde::{Deserialize, Serialize};

use super::flags::AlarmFlags;

// ─── Operating State ────────────────────────────────────────────────

/// High-level machine mode.
///
/// Exactly one `OperatingState` is active at any time. It is the only
/// field of the system record that survives a reset iteration. Motion is
/// gated on it: nothing that issues motion is accepted in `Alarm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum OperatingState {
    /// Ready, no motion in progress.
    #[default]
    Idle = 0,
    /// Latched fault. Cleared only by unlock or a successful homing cycle.
    Alarm = 1,
    /// Program check mode: commands parsed but not executed.
    CheckMode = 2,
    /// Homing cycle running.
    Homing = 3,
    /// Program motion running.
    Cycle = 4,
    /// Feed hold: decelerating or stopped mid-program.
    Hold = 5,
    /// Jog motion running.
    Jog = 6,
    /// Safety door open. Left by cycle start once the door reads closed.
    SafetyDoor = 7,
    /// Low-power sleep. A reset leaves it, entering the next run loop in
    /// `Alarm`.
    Sleep = 8,
}

impl OperatingState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Alarm),
            2 => Some(Self::CheckMode),
            3 => Some(Self::Homing),
            4 => Some(Self::Cycle),
            5 => Some(Self::Hold),
            6 => Some(Self::Jog),
            7 => Some(Self::SafetyDoor),
            8 => Some(Self::Sleep),
            _ => None,
        }
    }

    /// Whether motion-issuing operations may be accepted in this state.
    #[inline]
    pub const fn allows_motion(self) -> bool {
        !matches!(self, Self::Alarm | Self::SafetyDoor | Self::Sleep)
    }

    #[inline]
    pub const fn is_alarm(self) -> bool {
        matches!(self, Self::Alarm)
    }

    /// Whether the machine is executing motion (program or jog).
    #[inline]
    pub const fn is_moving(self) -> bool {
        matches!(self, Self::Cycle | Self::Jog | Self::Homing)
    }
}

// ─── Probe State ────────────────────────────────────────────────────

/// Probe handshake between the probing cycle and the trigger detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ProbeState {
    #[default]
    Inactive = 0,
    /// Probing cycle running; the trigger detector is watching the pin.
    Armed = 1,
    /// Trigger seen; probe position captured.
    Triggered = 2,
}

impl ProbeState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Inactive),
            1 => Some(Self::Armed),
            2 => Some(Self::Triggered),
            _ => None,
        }
    }
}

// ─── Alarm Cause ────────────────────────────────────────────────────

/// Reason reported when entering `Alarm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmCause {
    HardLimit,
    SoftLimit,
    AbortCycle,
    ProbeFailInitial,
    ProbeFailContact,
    HomingFail,
}

impl AlarmCause {
    /// Pick the cause to report from a set of pending alarm flags.
    ///
    /// Hard limits take precedence, then soft limits, aborts, probe and
    /// homing failures. Returns `None` for an empty set.
    pub fn from_flags(flags: AlarmFlags) -> Option<Self> {
        const PRIORITY: [(AlarmFlags, AlarmCause); 6] = [
            (AlarmFlags::HARD_LIMIT, AlarmCause::HardLimit),
            (AlarmFlags::SOFT_LIMIT, AlarmCause::SoftLimit),
            (AlarmFlags::ABORT_CYCLE, AlarmCause::AbortCycle),
            (AlarmFlags::PROBE_FAIL_INITIAL, AlarmCause::ProbeFailInitial),
            (AlarmFlags::PROBE_FAIL_CONTACT, AlarmCause::ProbeFailContact),
            (AlarmFlags::HOMING_FAIL, AlarmCause::HomingFail),
        ];

        PRIORITY
            .iter()
            .find(|(flag, _)| flags.contains(*flag))
            .map(|(_, cause)| *cause)
    }

    /// The flag that raises this cause.
    pub const fn flag(self) -> AlarmFlags {
        match self {
            Self::HardLimit => AlarmFlags::HARD_LIMIT,
            Self::SoftLimit => AlarmFlags::SOFT_LIMIT,
            Self::AbortCycle => AlarmFlags::ABORT_CYCLE,
            Self::ProbeFailInitial => AlarmFlags::PROBE_FAIL_INITIAL,
            Self::ProbeFailContact => AlarmFlags::PROBE_FAIL_CONTACT,
            Self::HomingFail => AlarmFlags::HOMING_FAIL,
        }
    }
}

impl core::fmt::Display for AlarmCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Self::HardLimit => "Hard limit triggered",
            Self::SoftLimit => "Soft limit exceeded",
            Self::AbortCycle => "Reset while in motion",
            Self::ProbeFailInitial => "Probe not in expected initial state",
            Self::ProbeFailContact => "Probe did not contact the workpiece",
            Self::HomingFail => "Homing cycle failed",
        };
        f.write_str(text)
    }
}
