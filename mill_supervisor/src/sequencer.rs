//! Reset Sequencer.
//!
//! ```text
//! ColdBoot ──initialize──▶ RunIteration ──abort──▶ RunIteration ──▶ …
//! ```
//!
//! `initialize` runs once. Every reset iteration, including the first,
//! then does:
//!
//! 1. Clear the System State Record, keeping only the Operating State.
//! 2. Clear the probe registers and every Signal Bus register.
//! 3. Reinitialize every collaborator in fixed order.
//! 4. Sync planner and parser to Machine Position.
//! 5. Emit the startup notice.
//! 6. Run the foreground loop until it returns on abort.
//!
//! Nothing here can fail. A collaborator that cannot reach a safe state
//! during step 3 raises an alarm flag; the bus was cleared in step 2, so
//! that flag reaches the foreground of the same iteration.

use mill_common::consts::N_AXIS;
use mill_common::supervisor::config::BootPolicy;
use tracing::{debug, info};

use crate::collab::{BootHardware, Collaborators, ForegroundLoop};
use crate::foreground::ForegroundContext;
use crate::report::STARTUP_NOTICE;
use crate::shared::SharedState;
use crate::state::SystemState;

pub struct ResetSequencer<'a> {
    shared: &'a SharedState,
    system: SystemState,
    iterations: u64,
}

impl<'a> ResetSequencer<'a> {
    /// Cold boot: hardware bring-up, zero Machine Position, pick the
    /// initial Operating State from `policy` and the persisted settings.
    pub fn initialize(
        shared: &'a SharedState,
        hardware: &mut dyn BootHardware,
        policy: BootPolicy,
    ) -> Self {
        hardware.configure_transport();
        let settings = hardware.load_settings();
        hardware.configure_stepper();
        hardware.configure_control_pins();

        // Interrupts are still off: the only write Machine Position ever
        // gets outside the step generator.
        shared.machine_position.store(&[0; N_AXIS]);
        hardware.enable_interrupts();

        let state = policy.initial_state(&settings);
        info!(
            "boot: state={:?} (force_alarm_on_boot={}, lock_until_homed={}, homing_enabled={})",
            state, policy.force_alarm_on_boot, policy.lock_until_homed, settings.homing_enabled
        );

        Self {
            shared,
            system: SystemState::new(state),
            iterations: 0,
        }
    }

    #[inline]
    pub fn system(&self) -> &SystemState {
        &self.system
    }

    #[inline]
    pub fn shared(&self) -> &'a SharedState {
        self.shared
    }

    /// Reset iterations started so far.
    #[inline]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Steps 1 to 5 of a reset iteration.
    pub fn prepare_iteration(&mut self, collab: &mut Collaborators<'_>) {
        self.iterations += 1;
        info!(
            "reset iteration {} (state={:?})",
            self.iterations,
            self.system.state()
        );

        self.system = self.system.begin_reset_iteration();

        self.shared.probe.clear();
        self.shared.bus.clear_all();

        collab.reinit_all(self.shared);

        let machine = self.shared.machine_position.snapshot();
        debug!("sync planner and parser to {:?}", machine);
        collab.sync_positions(&machine);

        collab.reporter.startup_notice(STARTUP_NOTICE);
    }

    /// One full reset iteration: prepare, then run the foreground loop
    /// until it returns.
    pub fn run_iteration(
        &mut self,
        collab: &mut Collaborators<'_>,
        foreground: &mut dyn ForegroundLoop,
    ) {
        self.prepare_iteration(collab);

        let mut ctx = ForegroundContext::new(self.shared, &mut self.system, &mut *collab.reporter);
        foreground.run(&mut ctx);
        debug!("foreground returned (state={:?})", ctx.state());
    }

    /// Run iterations while `keep_going` holds. Checked before each
    /// iteration.
    pub fn run_while<P>(
        &mut self,
        collab: &mut Collaborators<'_>,
        foreground: &mut dyn ForegroundLoop,
        mut keep_going: P,
    ) where
        P: FnMut(&Self) -> bool,
    {
        while keep_going(self) {
            self.run_iteration(collab, foreground);
        }
    }

    /// Run forever, as firmware does.
    pub fn run(mut self, collab: &mut Collaborators<'_>, foreground: &mut dyn ForegroundLoop) -> ! {
        loop {
            self.run_iteration(collab, foreground);
        }
    }
}
