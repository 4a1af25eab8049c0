//! Realtime flag sets (Signal Bus registers and record bitfields).
//!
//! Each Signal Bus register is one byte. Distinct concurrent events use
//! distinct bits, so setting one never overwrites another.

use bitflags::bitflags;
use static_assertions::const_assert_eq;

bitflags! {
    /// Execution state requests.
    ///
    /// Set by the control-character detector and the control pin change
    /// interrupt; cleared by the foreground after acting on them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExecState: u8 {
        const STATUS_REPORT = 0x01;
        const CYCLE_START   = 0x02;
        const CYCLE_STOP    = 0x04;
        const FEED_HOLD     = 0x08;
        /// Soft reset / abort. The only cancellation mechanism.
        const RESET         = 0x10;
        const SAFETY_DOOR   = 0x20;
        const MOTION_CANCEL = 0x40;
        const SLEEP         = 0x80;
    }
}

bitflags! {
    /// Alarm reasons.
    ///
    /// Set by interrupt or motion-control context; the foreground performs
    /// the transition to `Alarm` and picks the reported cause.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AlarmFlags: u8 {
        const HARD_LIMIT         = 0x01;
        const SOFT_LIMIT         = 0x02;
        /// Reset issued while motion was in progress; position may be lost.
        const ABORT_CYCLE        = 0x04;
        const PROBE_FAIL_INITIAL = 0x08;
        const PROBE_FAIL_CONTACT = 0x10;
        const HOMING_FAIL        = 0x20;
    }
}

bitflags! {
    /// Feed and rapid override requests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MotionOverride: u8 {
        const FEED_RESET        = 0x01;
        const FEED_COARSE_PLUS  = 0x02;
        const FEED_COARSE_MINUS = 0x04;
        const FEED_FINE_PLUS    = 0x08;
        const FEED_FINE_MINUS   = 0x10;
        const RAPID_RESET       = 0x20;
        const RAPID_MEDIUM      = 0x40;
        const RAPID_LOW         = 0x80;
    }
}

bitflags! {
    /// Spindle and coolant override requests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessoryOverride: u8 {
        const SPINDLE_RESET        = 0x01;
        const SPINDLE_COARSE_PLUS  = 0x02;
        const SPINDLE_COARSE_MINUS = 0x04;
        const SPINDLE_FINE_PLUS    = 0x08;
        const SPINDLE_FINE_MINUS   = 0x10;
        const SPINDLE_STOP         = 0x20;
        const COOLANT_FLOOD_TOGGLE = 0x40;
        const COOLANT_MIST_TOGGLE  = 0x80;
    }
}

bitflags! {
    /// Suspend bookkeeping kept in the system record (foreground only).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SuspendFlags: u8 {
        const HOLD_COMPLETE     = 0x01;
        const RESTART_RETRACT   = 0x02;
        const RETRACT_COMPLETE  = 0x04;
        const INITIATE_RESTORE  = 0x08;
        const RESTORE_COMPLETE  = 0x10;
        const SAFETY_DOOR_AJAR  = 0x20;
        const MOTION_CANCEL     = 0x40;
        const JOG_CANCEL        = 0x80;
    }
}

bitflags! {
    /// Spindle stop override progress (foreground only).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpindleStopFlags: u8 {
        const INITIATE        = 0x01;
        const ENABLED         = 0x02;
        const RESTORE         = 0x04;
        const RESTORE_CYCLE   = 0x08;
    }
}

macro_rules! empty_default {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Default for $ty {
                fn default() -> Self {
                    Self::empty()
                }
            }
        )+
    };
}

empty_default!(
    ExecState,
    AlarmFlags,
    MotionOverride,
    AccessoryOverride,
    SuspendFlags,
    SpindleStopFlags,
);

// Signal Bus registers are single atomic bytes.
const_assert_eq!(core::mem::size_of::<ExecState>(), 1);
const_assert_eq!(core::mem::size_of::<AlarmFlags>(), 1);
const_assert_eq!(core::mem::size_of::<MotionOverride>(), 1);
const_assert_eq!(core::mem::size_of::<AccessoryOverride>(), 1);
