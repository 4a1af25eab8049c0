//! Integration test: cold boot and initial operating state.

use mill_common::supervisor::config::BootPolicy;
use mill_common::supervisor::state::OperatingState;

use mill_supervisor::sequencer::ResetSequencer;
use mill_supervisor::shared::SharedState;

use super::common::{RecHardware, ZERO};

fn policy(force_alarm_on_boot: bool, lock_until_homed: bool) -> BootPolicy {
    BootPolicy {
        force_alarm_on_boot,
        lock_until_homed,
    }
}

fn boot(policy: BootPolicy, homing_enabled: bool) -> (OperatingState, SharedState) {
    let shared = SharedState::new();
    let state = {
        let mut hw = RecHardware::new(&shared, homing_enabled);
        let seq = ResetSequencer::initialize(&shared, &mut hw, policy);
        seq.system().state()
    };
    (state, shared)
}

#[test]
fn boot_runs_hardware_bring_up_in_order() {
    let shared = SharedState::new();
    let mut hw = RecHardware::new(&shared, false);
    let _seq = ResetSequencer::initialize(&shared, &mut hw, policy(false, false));

    assert_eq!(
        hw.calls,
        vec!["transport", "settings", "stepper", "control_pins", "interrupts"]
    );
}

#[test]
fn position_is_zero_before_interrupts_enable() {
    let shared = SharedState::new();
    let stepper = shared.claim_stepper().unwrap();
    stepper.step_pulse(&[4, 4, 4]);

    let mut hw = RecHardware::new(&shared, false);
    let _seq = ResetSequencer::initialize(&shared, &mut hw, policy(false, false));
    assert_eq!(hw.position_at_enable, Some(ZERO));
}

#[test]
fn boot_is_idle_without_lock_or_force() {
    for (lock, homing) in [(false, false), (false, true), (true, false)] {
        let (state, shared) = boot(policy(false, lock), homing);
        assert_eq!(state, OperatingState::Idle, "lock={lock} homing={homing}");
        assert_eq!(shared.machine_position.snapshot(), ZERO);
    }
}

#[test]
fn homing_lock_boots_into_alarm_regardless_of_force() {
    for force in [false, true] {
        let (state, _) = boot(policy(force, true), true);
        assert_eq!(state, OperatingState::Alarm, "force={force}");
    }
}

#[test]
fn forced_alarm_ignores_homing_setting() {
    for homing in [false, true] {
        let (state, _) = boot(policy(true, false), homing);
        assert_eq!(state, OperatingState::Alarm, "homing={homing}");
    }
}

#[test]
fn compiled_policy_follows_features() {
    let compiled = BootPolicy::compiled();
    assert_eq!(compiled.force_alarm_on_boot, cfg!(feature = "force-init-alarm"));
    assert_eq!(compiled.lock_until_homed, cfg!(feature = "homing-init-lock"));
}
