//! Collaborator seams.
//!
//! The parser, planner, step generator and the rest are external to the
//! supervisor. Each exposes a synchronous, infallible reinitialization
//! entry point; a subsystem that cannot reach a safe state raises an
//! alarm flag on the bus instead of returning an error.

use mill_common::consts::AxisSteps;
use mill_common::supervisor::config::PersistedSettings;
use mill_common::supervisor::state::AlarmCause;

use crate::foreground::ForegroundContext;
use crate::report::StatusReport;
use crate::shared::SharedState;

/// A subsystem reinitialized on every reset iteration.
pub trait Subsystem {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Return to a quiescent, known-default condition.
    fn reinit(&mut self, shared: &SharedState);
}

/// A subsystem that keeps its own copy of the machine position.
pub trait PositionTracker: Subsystem {
    /// Adopt `machine` as the current position.
    fn sync_position(&mut self, machine: &AxisSteps);
}

/// Output channel for notices and reports.
pub trait Reporter {
    fn startup_notice(&mut self, notice: &str);

    fn alarm(&mut self, _cause: AlarmCause) {}

    fn status(&mut self, _report: &StatusReport) {}
}

/// One-time hardware bring-up, run before the first reset iteration.
pub trait BootHardware {
    /// Transport line settings and receive interrupt.
    fn configure_transport(&mut self);

    /// Load persisted settings from the settings store.
    fn load_settings(&mut self) -> PersistedSettings;

    /// Step/direction outputs and step timers.
    fn configure_stepper(&mut self);

    /// Control pin (reset, feed hold, cycle start, door) change interrupts.
    fn configure_control_pins(&mut self);

    /// Global interrupt enable. Nothing may write machine position before
    /// this returns except the boot sequence itself.
    fn enable_interrupts(&mut self);
}

/// The long-running command-processing loop.
pub trait ForegroundLoop {
    /// Process input until an abort is observed, then return.
    fn run(&mut self, ctx: &mut ForegroundContext<'_>);
}

/// Every collaborator the reset sequencer drives, in reinitialization
/// order.
pub struct Collaborators<'c> {
    pub transport: &'c mut dyn Subsystem,
    pub parser: &'c mut dyn PositionTracker,
    pub spindle: &'c mut dyn Subsystem,
    pub coolant: &'c mut dyn Subsystem,
    pub limits: &'c mut dyn Subsystem,
    pub probe: &'c mut dyn Subsystem,
    pub sleep: &'c mut dyn Subsystem,
    pub planner: &'c mut dyn PositionTracker,
    pub stepper: &'c mut dyn Subsystem,
    pub reporter: &'c mut dyn Reporter,
}

impl Collaborators<'_> {
    /// Reinitialize transport, parser, spindle, coolant, limits, probe,
    /// sleep, planner and stepper, in that order.
    pub(crate) fn reinit_all(&mut self, shared: &SharedState) {
        reinit(&mut *self.transport, shared);
        reinit(&mut *self.parser, shared);
        reinit(&mut *self.spindle, shared);
        reinit(&mut *self.coolant, shared);
        reinit(&mut *self.limits, shared);
        reinit(&mut *self.probe, shared);
        reinit(&mut *self.sleep, shared);
        reinit(&mut *self.planner, shared);
        reinit(&mut *self.stepper, shared);
    }

    /// Point the planner and parser at `machine`.
    pub(crate) fn sync_positions(&mut self, machine: &AxisSteps) {
        self.planner.sync_position(machine);
        self.parser.sync_position(machine);
    }
}

fn reinit<S: Subsystem + ?Sized>(subsystem: &mut S, shared: &SharedState) {
    tracing::debug!("reinit {}", subsystem.name());
    subsystem.reinit(shared);
}
