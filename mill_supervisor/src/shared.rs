//! Shared state touched by the interrupt domain.
//!
//! `SharedState` is built with a `const fn` so a firmware image can keep a
//! single instance in a `static`; tests build a fresh one per case.
//! Interrupt handlers never get `&SharedState` methods that clear
//! anything. They hold one of two ports:
//!
//! - [`InterruptPort`] (copyable): sets Signal Bus flags.
//! - [`StepperPort`] (unique): applies step pulses and watches the probe.

use core::sync::atomic::{AtomicBool, Ordering};

use mill_common::consts::AxisSteps;
use mill_common::supervisor::flags::{AccessoryOverride, AlarmFlags, ExecState, MotionOverride};
use static_assertions::{assert_impl_all, assert_not_impl_any};

use crate::position::{PositionRegister, ProbeRegisters};
use crate::signal::SignalBus;

/// Everything both domains share.
#[derive(Debug, Default)]
pub struct SharedState {
    /// Realtime executor flag registers.
    pub bus: SignalBus,
    /// Authoritative machine position [steps]. Written only by the step
    /// generator after boot; never zeroed by a reset iteration.
    pub machine_position: PositionRegister,
    /// Probe handshake and last trigger position.
    pub probe: ProbeRegisters,
    stepper_claimed: AtomicBool,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            bus: SignalBus::new(),
            machine_position: PositionRegister::new(),
            probe: ProbeRegisters::new(),
            stepper_claimed: AtomicBool::new(false),
        }
    }

    /// Flag-setting handle for an interrupt handler.
    #[inline]
    pub const fn interrupt_port(&self) -> InterruptPort<'_> {
        InterruptPort { shared: self }
    }

    /// Claim the single step-generator handle. Returns `None` once claimed.
    pub fn claim_stepper(&self) -> Option<StepperPort<'_>> {
        self.stepper_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| StepperPort { shared: self })
    }
}

assert_impl_all!(SharedState: Send, Sync);
assert_impl_all!(InterruptPort<'static>: Send, Copy);
assert_not_impl_any!(StepperPort<'static>: Clone);

// ─── Interrupt Port ─────────────────────────────────────────────────

/// Producer side of the Signal Bus.
///
/// Used by control-character detection, pin-change handlers and, for
/// symmetry, by the foreground when it requests something of itself.
#[derive(Debug, Clone, Copy)]
pub struct InterruptPort<'a> {
    shared: &'a SharedState,
}

impl InterruptPort<'_> {
    #[inline]
    pub fn set_exec_state(&self, flags: ExecState) {
        self.shared.bus.exec_state.set(flags);
    }

    /// Report an alarm cause. The foreground performs the transition.
    #[inline]
    pub fn raise_alarm(&self, flags: AlarmFlags) {
        self.shared.bus.alarm.set(flags);
    }

    #[inline]
    pub fn request_motion_override(&self, flags: MotionOverride) {
        self.shared.bus.motion_override.set(flags);
    }

    #[inline]
    pub fn request_accessory_override(&self, flags: AccessoryOverride) {
        self.shared.bus.accessory_override.set(flags);
    }

    #[inline]
    pub fn machine_position(&self) -> AxisSteps {
        self.shared.machine_position.snapshot()
    }
}

// ─── Stepper Port ───────────────────────────────────────────────────

/// Step-generator handle: the only writer of machine position.
///
/// Not `Clone`; obtained once through [`SharedState::claim_stepper`].
#[derive(Debug)]
pub struct StepperPort<'a> {
    shared: &'a SharedState,
}

impl StepperPort<'_> {
    /// Apply one pulse (per-axis deltas of -1, 0 or +1 in practice).
    #[inline]
    pub fn step_pulse(&self, deltas: &AxisSteps) {
        self.shared.machine_position.apply_pulse(deltas);
    }

    /// Sample the probe pin after a pulse.
    ///
    /// On the first trigger of an armed probe the machine position is
    /// captured and `MOTION_CANCEL` is requested. Returns whether a
    /// capture happened.
    #[inline]
    pub fn probe_sample(&self, triggered: bool) -> bool {
        if !triggered {
            return false;
        }
        let captured = self.shared.probe.capture(&self.shared.machine_position);
        if captured {
            self.shared.bus.exec_state.set(ExecState::MOTION_CANCEL);
        }
        captured
    }

    /// Flag-setting handle for the same interrupt.
    #[inline]
    pub fn interrupt_port(&self) -> InterruptPort<'_> {
        self.shared.interrupt_port()
    }
}
