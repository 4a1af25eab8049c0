//! Foreground side of the supervisor.
//!
//! [`ForegroundContext`] is what the reset sequencer hands to the run loop
//! on every iteration: the system record (exclusive), the consumer side of
//! the Signal Bus, and the reporter. [`execute_realtime`] is the reference
//! realtime executor: one call drains the bus and applies every pending
//! request to the operating state and overrides.

use mill_common::consts::AxisSteps;
use mill_common::supervisor::flags::{
    AccessoryOverride, AlarmFlags, ExecState, MotionOverride, SpindleStopFlags, SuspendFlags,
};
use mill_common::supervisor::state::{AlarmCause, OperatingState};
use tracing::{debug, info, warn};

use crate::collab::Reporter;
use crate::report::StatusReport;
use crate::shared::{InterruptPort, SharedState};
use crate::state::SystemState;

/// What the run loop should do after a realtime pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Abort observed: return to the reset sequencer.
    Abort,
}

/// Spindle action owed by the run loop for a spindle-stop override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpindleStopAction {
    Stop,
    Restore,
}

/// Requests that win over a cycle start arriving in the same pass.
const HALTING_REQUESTS: ExecState = ExecState::FEED_HOLD
    .union(ExecState::MOTION_CANCEL)
    .union(ExecState::SAFETY_DOOR)
    .union(ExecState::SLEEP);

/// Accessory requests that are not override percentages.
const ACCESSORY_PASSTHROUGH: AccessoryOverride = AccessoryOverride::COOLANT_FLOOD_TOGGLE
    .union(AccessoryOverride::COOLANT_MIST_TOGGLE);

// ─── Foreground Context ─────────────────────────────────────────────

pub struct ForegroundContext<'a> {
    shared: &'a SharedState,
    system: &'a mut SystemState,
    reporter: &'a mut dyn Reporter,
    accessory_pending: AccessoryOverride,
    last_alarm: Option<AlarmCause>,
    status_requests: u32,
}

impl<'a> ForegroundContext<'a> {
    pub(crate) fn new(
        shared: &'a SharedState,
        system: &'a mut SystemState,
        reporter: &'a mut dyn Reporter,
    ) -> Self {
        Self {
            shared,
            system,
            reporter,
            accessory_pending: AccessoryOverride::empty(),
            last_alarm: None,
            status_requests: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> OperatingState {
        self.system.state()
    }

    /// Change the operating state. Returns the previous state.
    pub fn set_operating_state(&mut self, state: OperatingState) -> OperatingState {
        let previous = self.system.set_operating_state(state);
        if previous != state {
            debug!("state {:?} -> {:?}", previous, state);
        }
        previous
    }

    #[inline]
    pub fn system(&self) -> &SystemState {
        self.system
    }

    #[inline]
    pub fn system_mut(&mut self) -> &mut SystemState {
        self.system
    }

    #[inline]
    pub fn shared(&self) -> &'a SharedState {
        self.shared
    }

    /// Producer handle for self-requests; they travel the same bus as
    /// interrupt requests.
    #[inline]
    pub fn signals(&self) -> InterruptPort<'a> {
        self.shared.interrupt_port()
    }

    #[inline]
    pub fn machine_position(&self) -> AxisSteps {
        self.shared.machine_position.snapshot()
    }

    #[inline]
    pub fn abort_requested(&self) -> bool {
        self.system.abort
    }

    pub fn last_alarm(&self) -> Option<AlarmCause> {
        self.last_alarm
    }

    /// Status reports served during this iteration.
    pub fn status_requests(&self) -> u32 {
        self.status_requests
    }

    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            state: self.system.state(),
            machine_position: self.machine_position(),
            overrides: self.system.overrides,
        }
    }

    // ── Signal Bus consumer ──

    pub fn take_exec_state(&mut self) -> ExecState {
        self.shared.bus.exec_state.take_and_clear()
    }

    /// Consume only the execution requests in `mask`. Used by long
    /// blocking motions (homing, probing) that watch for reset and door
    /// while leaving everything else for the next full pass.
    pub fn take_exec_requests(&mut self, mask: ExecState) -> ExecState {
        self.shared.bus.exec_state.take(mask)
    }

    pub fn take_alarms(&mut self) -> AlarmFlags {
        self.shared.bus.alarm.take_and_clear()
    }

    pub fn take_motion_overrides(&mut self) -> MotionOverride {
        self.shared.bus.motion_override.take_and_clear()
    }

    pub fn take_accessory_overrides(&mut self) -> AccessoryOverride {
        self.shared.bus.accessory_override.take_and_clear()
    }

    /// Coolant toggles left behind by [`execute_realtime`] for the run
    /// loop to apply to the coolant outputs.
    pub fn take_accessory_requests(&mut self) -> AccessoryOverride {
        core::mem::take(&mut self.accessory_pending)
    }

    // ── Probe cycle ──

    /// Arm the probe at the start of a probing motion.
    pub fn arm_probe(&mut self) -> bool {
        self.system.probe_succeeded = false;
        self.shared.probe.arm()
    }

    /// Finish a probing motion.
    ///
    /// Returns the captured position on contact. Without contact the probe
    /// is disarmed and `PROBE_FAIL_CONTACT` is raised on the bus. Either
    /// way the probe ends `Inactive`.
    pub fn finish_probe(&mut self) -> Option<AxisSteps> {
        // The step interrupt may still trigger until the disarm lands; a
        // failed disarm means the capture is there to collect.
        let result = if self.shared.probe.disarm() {
            None
        } else {
            self.shared.probe.take_result()
        };

        self.system.probe_succeeded = result.is_some();
        if result.is_none() {
            self.signals().raise_alarm(AlarmFlags::PROBE_FAIL_CONTACT);
        }
        result
    }

    // ── Run-loop entry ──

    /// First step of every run loop after a reset iteration.
    ///
    /// `Alarm` and `Sleep` enter as `Alarm`. Every other state enters as
    /// `Idle`: planner and stepper were just reset, so a held or running
    /// program is gone. With the door still open, `SAFETY_DOOR` is raised
    /// again for the first poll.
    pub fn enter_run_loop(&mut self, door_ajar: bool) -> OperatingState {
        match self.state() {
            OperatingState::Alarm | OperatingState::Sleep => {
                self.set_operating_state(OperatingState::Alarm);
            }
            _ => {
                self.set_operating_state(OperatingState::Idle);
                if door_ajar {
                    self.signals().set_exec_state(ExecState::SAFETY_DOOR);
                }
            }
        }
        self.state()
    }

    /// The safety door input reads closed again. A cycle start may then
    /// leave `SafetyDoor`.
    pub fn door_closed(&mut self) {
        self.system.suspend.remove(SuspendFlags::SAFETY_DOOR_AJAR);
    }

    // ── Spindle stop override ──

    /// Advance the spindle-stop override during a hold.
    ///
    /// `INITIATE` becomes `ENABLED` and the spindle must stop. `RESTORE`
    /// or `RESTORE_CYCLE` clears the override and the spindle must
    /// restart; `RESTORE_CYCLE` also requests the cycle start that
    /// resumes the program.
    pub fn service_spindle_stop(&mut self) -> Option<SpindleStopAction> {
        let stop = self.system.spindle_stop_override;
        if stop.contains(SpindleStopFlags::INITIATE) {
            self.system.spindle_stop_override = SpindleStopFlags::ENABLED;
            return Some(SpindleStopAction::Stop);
        }
        if stop.intersects(SpindleStopFlags::RESTORE | SpindleStopFlags::RESTORE_CYCLE) {
            self.system.spindle_stop_override = SpindleStopFlags::empty();
            if stop.contains(SpindleStopFlags::RESTORE_CYCLE) {
                self.signals().set_exec_state(ExecState::CYCLE_START);
            }
            return Some(SpindleStopAction::Restore);
        }
        None
    }

    // ── Alarm gate ──

    /// Explicit alarm unlock. Returns `false` if not in `Alarm`.
    pub fn unlock(&mut self) -> bool {
        if !self.state().is_alarm() {
            return false;
        }
        info!("alarm lock cleared by unlock");
        self.set_operating_state(OperatingState::Idle);
        true
    }

    /// Successful homing cycle: leaves `Alarm` or `Homing` for `Idle`.
    pub fn homing_complete(&mut self) -> bool {
        if !matches!(self.state(), OperatingState::Alarm | OperatingState::Homing) {
            return false;
        }
        info!("homing complete");
        self.system.homing_axis_lock = 0;
        self.set_operating_state(OperatingState::Idle);
        true
    }

    fn enter_alarm(&mut self, cause: AlarmCause) {
        warn!("ALARM: {cause}");
        self.set_operating_state(OperatingState::Alarm);
        self.last_alarm = Some(cause);
        self.reporter.alarm(cause);
    }
}

// ─── Realtime Executor ──────────────────────────────────────────────

/// Drain the Signal Bus and act on every pending request.
///
/// Alarms are handled first so that an alarm and a reset arriving
/// together leave the machine in `Alarm` across the reset.
pub fn execute_realtime(ctx: &mut ForegroundContext<'_>) -> Flow {
    let alarms = ctx.take_alarms();
    if let Some(cause) = AlarmCause::from_flags(alarms) {
        ctx.enter_alarm(cause);
    }

    let exec = ctx.take_exec_state();
    if exec.contains(ExecState::RESET) {
        if ctx.state().is_moving() {
            ctx.enter_alarm(AlarmCause::AbortCycle);
        }
        ctx.system.abort = true;
        info!("reset requested");
        return Flow::Abort;
    }
    apply_exec_state(ctx, exec);

    let motion = ctx.take_motion_overrides();
    if !motion.is_empty() && ctx.system.overrides.apply_motion(motion) {
        debug!(
            "feed override {}%, rapid override {}%",
            ctx.system.overrides.feed, ctx.system.overrides.rapid
        );
        ctx.system.report_override_counter = 0;
    }

    let accessory = ctx.take_accessory_overrides();
    if !accessory.is_empty() {
        apply_accessory(ctx, accessory);
    }

    Flow::Continue
}

fn apply_exec_state(ctx: &mut ForegroundContext<'_>, exec: ExecState) {
    use OperatingState::*;

    if exec.contains(ExecState::STATUS_REPORT) {
        ctx.status_requests += 1;
        let report = ctx.status_report();
        ctx.reporter.status(&report);
    }

    if exec.contains(ExecState::SLEEP) && ctx.state() != Sleep {
        ctx.set_operating_state(Sleep);
    }

    if exec.contains(ExecState::SAFETY_DOOR) && !matches!(ctx.state(), Alarm | Sleep) {
        // Program motion held by the door resumes once it closes.
        if matches!(ctx.state(), Cycle | Hold) {
            ctx.system.suspend |= SuspendFlags::HOLD_COMPLETE;
        }
        ctx.system.suspend |= SuspendFlags::SAFETY_DOOR_AJAR;
        ctx.set_operating_state(SafetyDoor);
    }

    if exec.contains(ExecState::MOTION_CANCEL) && matches!(ctx.state(), Cycle | Jog) {
        ctx.system.suspend |= SuspendFlags::MOTION_CANCEL;
        ctx.set_operating_state(Idle);
    }

    if exec.contains(ExecState::FEED_HOLD) {
        match ctx.state() {
            Cycle => {
                ctx.set_operating_state(Hold);
            }
            Jog => {
                ctx.system.suspend |= SuspendFlags::JOG_CANCEL;
                ctx.set_operating_state(Idle);
            }
            _ => {}
        }
    }

    if exec.contains(ExecState::CYCLE_START) && !exec.intersects(HALTING_REQUESTS) {
        cycle_start(ctx);
    }

    if exec.contains(ExecState::CYCLE_STOP) && matches!(ctx.state(), Cycle | Hold) {
        ctx.system.suspend = SuspendFlags::empty();
        ctx.set_operating_state(Idle);
    }
}

fn cycle_start(ctx: &mut ForegroundContext<'_>) {
    use OperatingState::*;

    match ctx.state() {
        Idle => resume_cycle(ctx),
        Hold if ctx
            .system
            .spindle_stop_override
            .contains(SpindleStopFlags::ENABLED) =>
        {
            ctx.system.spindle_stop_override |= SpindleStopFlags::RESTORE_CYCLE;
        }
        Hold => resume_cycle(ctx),
        SafetyDoor if !ctx.system.suspend.contains(SuspendFlags::SAFETY_DOOR_AJAR) => {
            if ctx.system.suspend.contains(SuspendFlags::HOLD_COMPLETE) {
                resume_cycle(ctx);
            } else {
                ctx.system.suspend = SuspendFlags::empty();
                ctx.set_operating_state(Idle);
            }
        }
        _ => {}
    }
}

fn resume_cycle(ctx: &mut ForegroundContext<'_>) {
    ctx.system.suspend = SuspendFlags::empty();
    ctx.system.spindle_stop_override = SpindleStopFlags::empty();
    ctx.set_operating_state(OperatingState::Cycle);
}

fn apply_accessory(ctx: &mut ForegroundContext<'_>, accessory: AccessoryOverride) {
    if ctx.system.overrides.apply_spindle(accessory) {
        debug!("spindle override {}%", ctx.system.overrides.spindle);
        ctx.system.report_override_counter = 0;
    }

    // Spindle stop is honored only while holding.
    if accessory.contains(AccessoryOverride::SPINDLE_STOP)
        && ctx.state() == OperatingState::Hold
    {
        let stop = &mut ctx.system.spindle_stop_override;
        if stop.is_empty() {
            *stop = SpindleStopFlags::INITIATE;
        } else if stop.contains(SpindleStopFlags::ENABLED) {
            *stop |= SpindleStopFlags::RESTORE;
        } else if stop.contains(SpindleStopFlags::INITIATE) {
            // Not yet acknowledged: cancel.
            *stop = SpindleStopFlags::empty();
        }
    }

    ctx.accessory_pending |= accessory & ACCESSORY_PASSTHROUGH;
}
