//! Integration test: realtime executor inside a reset iteration.

use mill_common::supervisor::config::BootPolicy;
use mill_common::supervisor::flags::{AccessoryOverride, AlarmFlags, ExecState, MotionOverride};
use mill_common::supervisor::state::{AlarmCause, OperatingState, ProbeState};

use mill_supervisor::foreground::{ForegroundContext, Flow, SpindleStopAction, execute_realtime};
use mill_supervisor::sequencer::ResetSequencer;
use mill_supervisor::shared::SharedState;

use super::common::{FnForeground, RecHardware, Rig};

const LOCKED: BootPolicy = BootPolicy {
    force_alarm_on_boot: false,
    lock_until_homed: true,
};

/// Poll until abort, as a real run loop would.
fn poll_until_abort(ctx: &mut ForegroundContext<'_>) {
    while execute_realtime(ctx) == Flow::Continue {}
}

#[test]
fn locked_boot_rejects_cycle_start_until_homed() {
    let shared = SharedState::new();
    let mut hw = RecHardware::new(&shared, true);
    let mut seq = ResetSequencer::initialize(&shared, &mut hw, LOCKED);
    let mut rig = Rig::new();

    let mut fg = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        assert_eq!(ctx.state(), OperatingState::Alarm);
        assert!(!ctx.state().allows_motion());

        ctx.signals().set_exec_state(ExecState::CYCLE_START);
        execute_realtime(ctx);
        assert_eq!(ctx.state(), OperatingState::Alarm);

        assert!(ctx.homing_complete());
        ctx.signals().set_exec_state(ExecState::CYCLE_START);
        execute_realtime(ctx);
        assert_eq!(ctx.state(), OperatingState::Cycle);

        ctx.signals().set_exec_state(ExecState::CYCLE_STOP);
        execute_realtime(ctx);
        ctx.signals().set_exec_state(ExecState::RESET);
        poll_until_abort(ctx);
        assert!(ctx.abort_requested());
    });
    seq.run_iteration(&mut rig.collaborators(), &mut fg);

    assert_eq!(seq.system().state(), OperatingState::Idle);
    assert!(rig.reporter.alarms.is_empty());
}

#[test]
fn reset_during_cycle_latches_alarm_across_iteration() {
    let shared = SharedState::new();
    let mut hw = RecHardware::new(&shared, false);
    let mut seq = ResetSequencer::initialize(
        &shared,
        &mut hw,
        BootPolicy {
            force_alarm_on_boot: false,
            lock_until_homed: false,
        },
    );
    let mut rig = Rig::new();
    let stepper = shared.claim_stepper().unwrap();

    let mut fg = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        ctx.signals().set_exec_state(ExecState::CYCLE_START);
        execute_realtime(ctx);
        stepper.step_pulse(&[1, 1, 0]);
        stepper.interrupt_port().set_exec_state(ExecState::RESET);
        poll_until_abort(ctx);
    });
    seq.run_iteration(&mut rig.collaborators(), &mut fg);
    assert_eq!(rig.reporter.alarms, vec![AlarmCause::AbortCycle]);

    let mut unlock = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        assert_eq!(ctx.state(), OperatingState::Alarm);
        assert_eq!(ctx.machine_position(), [1, 1, 0]);
        assert!(ctx.unlock());
    });
    seq.run_iteration(&mut rig.collaborators(), &mut unlock);
    assert_eq!(seq.system().state(), OperatingState::Idle);
}

#[test]
fn overrides_apply_then_reset_to_default() {
    let shared = SharedState::new();
    let mut hw = RecHardware::new(&shared, false);
    let mut seq = ResetSequencer::initialize(&shared, &mut hw, BootPolicy::compiled());
    let mut rig = Rig::new();

    let mut fg = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        for _ in 0..15 {
            ctx.signals().request_motion_override(MotionOverride::FEED_COARSE_PLUS);
            execute_realtime(ctx);
        }
        assert_eq!(ctx.system().overrides.feed, 200);

        ctx.signals().set_exec_state(ExecState::STATUS_REPORT);
        execute_realtime(ctx);
        assert_eq!(ctx.status_requests(), 1);
    });
    seq.run_iteration(&mut rig.collaborators(), &mut fg);

    assert_eq!(rig.reporter.statuses.len(), 1);
    assert_eq!(rig.reporter.statuses[0].overrides.feed, 200);
    assert_eq!(seq.system().overrides.feed, 200);

    seq.prepare_iteration(&mut rig.collaborators());
    assert_eq!(seq.system().overrides.feed, 100);
}

#[test]
fn probe_failure_alarm_reaches_next_poll() {
    let shared = SharedState::new();
    let mut hw = RecHardware::new(&shared, false);
    let mut seq = ResetSequencer::initialize(&shared, &mut hw, BootPolicy::compiled());
    let mut rig = Rig::new();

    let mut fg = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        ctx.set_operating_state(OperatingState::Cycle);
        assert!(ctx.arm_probe());
        assert_eq!(ctx.finish_probe(), None);
        assert_eq!(ctx.shared().bus.alarm.peek(), AlarmFlags::PROBE_FAIL_CONTACT);
        execute_realtime(ctx);
        assert_eq!(ctx.last_alarm(), Some(AlarmCause::ProbeFailContact));
    });
    seq.run_iteration(&mut rig.collaborators(), &mut fg);

    assert_eq!(seq.system().state(), OperatingState::Alarm);
}

const UNLOCKED: BootPolicy = BootPolicy {
    force_alarm_on_boot: false,
    lock_until_homed: false,
};

#[test]
fn sleep_then_reset_enters_alarm_and_unlocks() {
    let shared = SharedState::new();
    let mut hw = RecHardware::new(&shared, false);
    let mut seq = ResetSequencer::initialize(&shared, &mut hw, UNLOCKED);
    let mut rig = Rig::new();

    let mut sleep = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        assert_eq!(ctx.enter_run_loop(false), OperatingState::Idle);
        ctx.signals().set_exec_state(ExecState::SLEEP);
        execute_realtime(ctx);
        assert_eq!(ctx.state(), OperatingState::Sleep);
        ctx.signals().set_exec_state(ExecState::RESET);
        poll_until_abort(ctx);
    });
    seq.run_iteration(&mut rig.collaborators(), &mut sleep);
    assert_eq!(seq.system().state(), OperatingState::Sleep);

    let mut wake = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        assert_eq!(ctx.enter_run_loop(false), OperatingState::Alarm);
        ctx.signals().set_exec_state(ExecState::CYCLE_START);
        execute_realtime(ctx);
        assert_eq!(ctx.state(), OperatingState::Alarm);
        assert!(ctx.unlock());
    });
    seq.run_iteration(&mut rig.collaborators(), &mut wake);
    assert_eq!(seq.system().state(), OperatingState::Idle);
}

#[test]
fn reset_during_hold_drops_the_held_program() {
    let shared = SharedState::new();
    let mut hw = RecHardware::new(&shared, false);
    let mut seq = ResetSequencer::initialize(&shared, &mut hw, UNLOCKED);
    let mut rig = Rig::new();

    let mut hold = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        ctx.enter_run_loop(false);
        ctx.signals().set_exec_state(ExecState::CYCLE_START);
        execute_realtime(ctx);
        ctx.signals().set_exec_state(ExecState::FEED_HOLD);
        execute_realtime(ctx);
        assert_eq!(ctx.state(), OperatingState::Hold);
        ctx.signals().set_exec_state(ExecState::RESET);
        poll_until_abort(ctx);
    });
    seq.run_iteration(&mut rig.collaborators(), &mut hold);
    assert_eq!(seq.system().state(), OperatingState::Hold);
    assert!(rig.reporter.alarms.is_empty());

    let mut next = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        assert_eq!(ctx.enter_run_loop(false), OperatingState::Idle);
        ctx.signals().set_exec_state(ExecState::CYCLE_STOP);
        execute_realtime(ctx);
        assert_eq!(ctx.state(), OperatingState::Idle);
    });
    seq.run_iteration(&mut rig.collaborators(), &mut next);
    assert_eq!(seq.system().state(), OperatingState::Idle);
}

#[test]
fn door_left_open_across_reset_keeps_machine_parked() {
    let shared = SharedState::new();
    let mut hw = RecHardware::new(&shared, false);
    let mut seq = ResetSequencer::initialize(&shared, &mut hw, UNLOCKED);
    let mut rig = Rig::new();

    let mut open = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        ctx.enter_run_loop(false);
        ctx.signals().set_exec_state(ExecState::SAFETY_DOOR);
        execute_realtime(ctx);
        ctx.signals().set_exec_state(ExecState::RESET);
        poll_until_abort(ctx);
    });
    seq.run_iteration(&mut rig.collaborators(), &mut open);
    assert_eq!(seq.system().state(), OperatingState::SafetyDoor);

    let mut reopen = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        assert_eq!(ctx.enter_run_loop(true), OperatingState::Idle);
        execute_realtime(ctx);
        assert_eq!(ctx.state(), OperatingState::SafetyDoor);

        ctx.door_closed();
        ctx.signals().set_exec_state(ExecState::CYCLE_START);
        execute_realtime(ctx);
        assert_eq!(ctx.state(), OperatingState::Idle);
    });
    seq.run_iteration(&mut rig.collaborators(), &mut reopen);
    assert_eq!(seq.system().state(), OperatingState::Idle);
}

#[test]
fn spindle_stop_override_resumes_after_restore() {
    let shared = SharedState::new();
    let mut hw = RecHardware::new(&shared, false);
    let mut seq = ResetSequencer::initialize(&shared, &mut hw, UNLOCKED);
    let mut rig = Rig::new();

    let mut fg = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        ctx.enter_run_loop(false);
        ctx.signals().set_exec_state(ExecState::CYCLE_START);
        execute_realtime(ctx);
        ctx.signals().set_exec_state(ExecState::FEED_HOLD);
        execute_realtime(ctx);

        let mut actions = Vec::new();
        ctx.signals().request_accessory_override(AccessoryOverride::SPINDLE_STOP);
        execute_realtime(ctx);
        actions.extend(ctx.service_spindle_stop());

        ctx.signals().set_exec_state(ExecState::CYCLE_START);
        execute_realtime(ctx);
        assert_eq!(ctx.state(), OperatingState::Hold);
        actions.extend(ctx.service_spindle_stop());

        execute_realtime(ctx);
        assert_eq!(ctx.state(), OperatingState::Cycle);
        assert_eq!(actions, vec![SpindleStopAction::Stop, SpindleStopAction::Restore]);
    });
    seq.run_iteration(&mut rig.collaborators(), &mut fg);
    assert_eq!(seq.system().state(), OperatingState::Cycle);
}

#[test]
fn contact_during_probing_cycle_is_collected() {
    let shared = SharedState::new();
    let mut hw = RecHardware::new(&shared, false);
    let mut seq = ResetSequencer::initialize(&shared, &mut hw, UNLOCKED);
    let mut rig = Rig::new();
    let stepper = shared.claim_stepper().unwrap();

    let mut fg = FnForeground(|ctx: &mut ForegroundContext<'_>| {
        ctx.enter_run_loop(false);
        ctx.signals().set_exec_state(ExecState::CYCLE_START);
        execute_realtime(ctx);
        assert!(ctx.arm_probe());

        stepper.step_pulse(&[0, 0, -3]);
        assert!(stepper.probe_sample(true));
        assert_eq!(ctx.finish_probe(), Some([0, 0, -3]));
        assert_eq!(ctx.shared().probe.state(), ProbeState::Inactive);

        execute_realtime(ctx);
        assert_eq!(ctx.state(), OperatingState::Idle);
        assert_eq!(ctx.last_alarm(), None);
        assert!(ctx.system().probe_succeeded);
        assert!(ctx.arm_probe());
    });
    seq.run_iteration(&mut rig.collaborators(), &mut fg);
    assert_eq!(shared.probe.state(), ProbeState::Armed);
}
