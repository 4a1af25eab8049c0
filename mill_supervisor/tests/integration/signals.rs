//! Integration test: Signal Bus delivery across threads.
//!
//! Producer threads stand in for interrupt handlers; the foreground
//! consumes through its context once they have finished.

use std::thread;

use mill_common::supervisor::config::BootPolicy;
use mill_common::supervisor::flags::{AccessoryOverride, AlarmFlags, ExecState, MotionOverride};

use mill_supervisor::foreground::ForegroundContext;
use mill_supervisor::sequencer::ResetSequencer;
use mill_supervisor::shared::SharedState;

use super::common::{FnForeground, RecHardware, Rig};

fn run_foreground<F>(body: F)
where
    F: FnMut(&mut ForegroundContext<'_>),
{
    let shared = SharedState::new();
    let mut hw = RecHardware::new(&shared, false);
    let mut seq = ResetSequencer::initialize(&shared, &mut hw, BootPolicy::compiled());
    let mut rig = Rig::new();
    seq.run_iteration(&mut rig.collaborators(), &mut FnForeground(body));
}

#[test]
fn concurrent_sets_are_taken_exactly_once() {
    const ALL: [MotionOverride; 8] = [
        MotionOverride::FEED_RESET,
        MotionOverride::FEED_COARSE_PLUS,
        MotionOverride::FEED_COARSE_MINUS,
        MotionOverride::FEED_FINE_PLUS,
        MotionOverride::FEED_FINE_MINUS,
        MotionOverride::RAPID_RESET,
        MotionOverride::RAPID_MEDIUM,
        MotionOverride::RAPID_LOW,
    ];

    run_foreground(|ctx| {
        let port = ctx.signals();
        thread::scope(|s| {
            for flag in ALL {
                s.spawn(move || {
                    for _ in 0..1_000 {
                        port.request_motion_override(flag);
                    }
                });
            }
        });

        assert_eq!(ctx.take_motion_overrides(), MotionOverride::all());
        assert_eq!(ctx.take_motion_overrides(), MotionOverride::empty());
    });
}

#[test]
fn registers_are_independent() {
    run_foreground(|ctx| {
        let port = ctx.signals();
        thread::scope(|s| {
            s.spawn(move || port.set_exec_state(ExecState::FEED_HOLD));
            s.spawn(move || port.raise_alarm(AlarmFlags::HARD_LIMIT));
            s.spawn(move || port.request_accessory_override(AccessoryOverride::SPINDLE_STOP));
        });

        assert_eq!(ctx.take_alarms(), AlarmFlags::HARD_LIMIT);
        assert_eq!(ctx.take_exec_state(), ExecState::FEED_HOLD);
        assert_eq!(ctx.take_motion_overrides(), MotionOverride::empty());
        assert_eq!(ctx.take_accessory_overrides(), AccessoryOverride::SPINDLE_STOP);
        assert!(ctx.shared().bus.is_empty());
    });
}

#[test]
fn no_flag_lost_while_consuming() {
    run_foreground(|ctx| {
        let port = ctx.signals();
        let mut seen = ExecState::empty();
        thread::scope(|s| {
            let producer = s.spawn(move || {
                for _ in 0..10_000 {
                    port.set_exec_state(ExecState::STATUS_REPORT);
                    port.set_exec_state(ExecState::CYCLE_STOP);
                }
            });
            while !producer.is_finished() {
                seen |= ctx.take_exec_state();
            }
        });
        seen |= ctx.take_exec_state();

        assert_eq!(seen, ExecState::STATUS_REPORT | ExecState::CYCLE_STOP);
        assert!(ctx.take_exec_state().is_empty());
    });
}
