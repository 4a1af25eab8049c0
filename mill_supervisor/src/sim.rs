//! Simulated machine for the `mill_supervisor` binary.
//!
//! Host threads stand in for the interrupt domain:
//!
//! - `sim-stepper` owns the [`StepperPort`] and emits one X pulse per step
//!   interval while the foreground reports motion.
//! - `sim-rx` reads realtime bytes from stdin and sets bus flags.
//!
//! Both stay idle until [`BootHardware::enable_interrupts`] opens the gate.
//!
//! The simulated door switch is momentary: `0x84` opens it and it reads
//! closed again on the next poll, so `~` resumes.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use mill_common::consts::{AxisSteps, N_AXIS};
use mill_common::supervisor::config::PersistedSettings;
use mill_common::supervisor::flags::{AccessoryOverride, ExecState, MotionOverride};
use mill_common::supervisor::state::{AlarmCause, OperatingState};
use thiserror::Error;
use tracing::{debug, info, warn};

use mill_supervisor::collab::{
    BootHardware, Collaborators, ForegroundLoop, PositionTracker, Reporter, Subsystem,
};
use mill_supervisor::foreground::{
    ForegroundContext, Flow, SpindleStopAction, execute_realtime,
};
use mill_supervisor::report::StatusReport;
use mill_supervisor::shared::{InterruptPort, SharedState, StepperPort};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("stepper port already claimed")]
    StepperClaimed,
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("CPU affinity setup failed: {0}")]
    Affinity(String),
}

// ─── Realtime Bytes ─────────────────────────────────────────────────

/// A realtime control byte decoded into the bus register it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeRequest {
    Exec(ExecState),
    Motion(MotionOverride),
    Accessory(AccessoryOverride),
}

impl RealtimeRequest {
    pub fn dispatch(self, port: InterruptPort<'_>) {
        match self {
            Self::Exec(flags) => port.set_exec_state(flags),
            Self::Motion(flags) => port.request_motion_override(flags),
            Self::Accessory(flags) => port.request_accessory_override(flags),
        }
    }
}

/// Decode a realtime byte. Anything else belongs to the line protocol.
pub const fn realtime_request(byte: u8) -> Option<RealtimeRequest> {
    use RealtimeRequest::*;

    let request = match byte {
        b'?' => Exec(ExecState::STATUS_REPORT),
        b'~' => Exec(ExecState::CYCLE_START),
        b'!' => Exec(ExecState::FEED_HOLD),
        0x18 => Exec(ExecState::RESET),
        0x84 => Exec(ExecState::SAFETY_DOOR),
        0x85 => Exec(ExecState::MOTION_CANCEL),

        0x90 => Motion(MotionOverride::FEED_RESET),
        0x91 => Motion(MotionOverride::FEED_COARSE_PLUS),
        0x92 => Motion(MotionOverride::FEED_COARSE_MINUS),
        0x93 => Motion(MotionOverride::FEED_FINE_PLUS),
        0x94 => Motion(MotionOverride::FEED_FINE_MINUS),
        0x95 => Motion(MotionOverride::RAPID_RESET),
        0x96 => Motion(MotionOverride::RAPID_MEDIUM),
        0x97 => Motion(MotionOverride::RAPID_LOW),

        0x99 => Accessory(AccessoryOverride::SPINDLE_RESET),
        0x9A => Accessory(AccessoryOverride::SPINDLE_COARSE_PLUS),
        0x9B => Accessory(AccessoryOverride::SPINDLE_COARSE_MINUS),
        0x9C => Accessory(AccessoryOverride::SPINDLE_FINE_PLUS),
        0x9D => Accessory(AccessoryOverride::SPINDLE_FINE_MINUS),
        0x9E => Accessory(AccessoryOverride::SPINDLE_STOP),
        0xA0 => Accessory(AccessoryOverride::COOLANT_FLOOD_TOGGLE),
        0xA1 => Accessory(AccessoryOverride::COOLANT_MIST_TOGGLE),
        _ => return None,
    };
    Some(request)
}

// ─── Collaborators ──────────────────────────────────────────────────

#[derive(Debug)]
pub struct SimSubsystem {
    name: &'static str,
    reinits: u64,
}

impl SimSubsystem {
    pub const fn new(name: &'static str) -> Self {
        Self { name, reinits: 0 }
    }
}

impl Subsystem for SimSubsystem {
    fn name(&self) -> &'static str {
        self.name
    }

    fn reinit(&mut self, _shared: &SharedState) {
        self.reinits += 1;
        debug!("{} reinit #{}", self.name, self.reinits);
    }
}

/// Parser or planner stand-in: keeps the last synced position.
#[derive(Debug)]
pub struct SimTracker {
    name: &'static str,
    position: AxisSteps,
}

impl SimTracker {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            position: [0; N_AXIS],
        }
    }

    pub fn position(&self) -> AxisSteps {
        self.position
    }
}

impl Subsystem for SimTracker {
    fn name(&self) -> &'static str {
        self.name
    }

    fn reinit(&mut self, _shared: &SharedState) {
        self.position = [0; N_AXIS];
    }
}

impl PositionTracker for SimTracker {
    fn sync_position(&mut self, machine: &AxisSteps) {
        self.position = *machine;
    }
}

/// Step generator stand-in: a reset stops motion.
#[derive(Debug)]
pub struct SimStepper {
    motion: Arc<AtomicBool>,
}

impl Subsystem for SimStepper {
    fn name(&self) -> &'static str {
        "stepper"
    }

    fn reinit(&mut self, _shared: &SharedState) {
        self.motion.store(false, Ordering::Release);
    }
}

/// Reporter that writes through `tracing`.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn startup_notice(&mut self, notice: &str) {
        info!("{notice}");
    }

    fn alarm(&mut self, cause: AlarmCause) {
        warn!("ALARM: {cause}");
    }

    fn status(&mut self, report: &StatusReport) {
        match report.render() {
            Ok(line) => info!("{line}"),
            Err(_) => warn!("status line overflow: {report:?}"),
        }
    }
}

/// Every simulated collaborator the sequencer drives.
#[derive(Debug)]
pub struct SimMachine {
    pub transport: SimSubsystem,
    pub parser: SimTracker,
    pub spindle: SimSubsystem,
    pub coolant: SimSubsystem,
    pub limits: SimSubsystem,
    pub probe: SimSubsystem,
    pub sleep: SimSubsystem,
    pub planner: SimTracker,
    pub stepper: SimStepper,
    pub reporter: LogReporter,
}

impl SimMachine {
    pub fn new(motion: Arc<AtomicBool>) -> Self {
        Self {
            transport: SimSubsystem::new("transport"),
            parser: SimTracker::new("parser"),
            spindle: SimSubsystem::new("spindle"),
            coolant: SimSubsystem::new("coolant"),
            limits: SimSubsystem::new("limits"),
            probe: SimSubsystem::new("probe"),
            sleep: SimSubsystem::new("sleep"),
            planner: SimTracker::new("planner"),
            stepper: SimStepper { motion },
            reporter: LogReporter,
        }
    }

    pub fn collaborators(&mut self) -> Collaborators<'_> {
        Collaborators {
            transport: &mut self.transport,
            parser: &mut self.parser,
            spindle: &mut self.spindle,
            coolant: &mut self.coolant,
            limits: &mut self.limits,
            probe: &mut self.probe,
            sleep: &mut self.sleep,
            planner: &mut self.planner,
            stepper: &mut self.stepper,
            reporter: &mut self.reporter,
        }
    }
}

// ─── Foreground ─────────────────────────────────────────────────────

/// Run loop that only serves realtime requests.
#[derive(Debug)]
pub struct SimForeground {
    poll_interval: Duration,
    motion: Arc<AtomicBool>,
}

impl SimForeground {
    pub fn new(poll_interval: Duration, motion: Arc<AtomicBool>) -> Self {
        Self {
            poll_interval,
            motion,
        }
    }
}

impl ForegroundLoop for SimForeground {
    fn run(&mut self, ctx: &mut ForegroundContext<'_>) {
        let entered = ctx.enter_run_loop(false);
        debug!("run loop entered in {:?}", entered);

        loop {
            if execute_realtime(ctx) == Flow::Abort {
                break;
            }

            if ctx.state() == OperatingState::SafetyDoor {
                ctx.door_closed();
            }

            match ctx.service_spindle_stop() {
                Some(SpindleStopAction::Stop) => info!("spindle stopped during hold"),
                Some(SpindleStopAction::Restore) => info!("spindle restored"),
                None => {}
            }

            let coolant = ctx.take_accessory_requests();
            if !coolant.is_empty() {
                debug!("coolant toggle {:?}", coolant);
            }

            self.motion.store(ctx.state().is_moving(), Ordering::Release);

            thread::sleep(self.poll_interval);
        }
        self.motion.store(false, Ordering::Release);
    }
}

// ─── Hardware ───────────────────────────────────────────────────────

/// Simulated boot hardware plus the interrupt-domain threads.
pub struct SimHardware {
    settings: PersistedSettings,
    interrupts: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    stepper: Option<JoinHandle<()>>,
}

impl SimHardware {
    /// Claim the stepper port and spawn the interrupt threads. They wait
    /// for `enable_interrupts`.
    pub fn spawn(
        shared: &'static SharedState,
        settings: PersistedSettings,
        step_interval: Duration,
        motion: Arc<AtomicBool>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, SimError> {
        let port = shared.claim_stepper().ok_or(SimError::StepperClaimed)?;
        let interrupts = Arc::new(AtomicBool::new(false));

        let gate = interrupts.clone();
        let stop = shutdown.clone();
        let stepper = thread::Builder::new()
            .name("sim-stepper".into())
            .spawn(move || stepper_loop(port, &gate, &motion, &stop, step_interval))
            .map_err(|source| SimError::Spawn {
                name: "sim-stepper",
                source,
            })?;

        // Blocks on stdin; left detached.
        let gate = interrupts.clone();
        let rx = shared.interrupt_port();
        thread::Builder::new()
            .name("sim-rx".into())
            .spawn(move || realtime_input_loop(rx, &gate))
            .map_err(|source| SimError::Spawn {
                name: "sim-rx",
                source,
            })?;

        Ok(Self {
            settings,
            interrupts,
            shutdown,
            stepper: Some(stepper),
        })
    }

    /// Stop and join the stepper thread.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.stepper.take() {
            if handle.join().is_err() {
                warn!("sim-stepper thread panicked");
            }
        }
    }
}

impl BootHardware for SimHardware {
    fn configure_transport(&mut self) {
        debug!("transport: stdin realtime bytes");
    }

    fn load_settings(&mut self) -> PersistedSettings {
        self.settings
    }

    fn configure_stepper(&mut self) {
        debug!("stepper: {} axes", N_AXIS);
    }

    fn configure_control_pins(&mut self) {}

    fn enable_interrupts(&mut self) {
        self.interrupts.store(true, Ordering::Release);
    }
}

impl Drop for SimHardware {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn stepper_loop(
    port: StepperPort<'static>,
    interrupts: &AtomicBool,
    motion: &AtomicBool,
    shutdown: &AtomicBool,
    interval: Duration,
) {
    let mut pulse = [0; N_AXIS];
    pulse[0] = 1;

    while !shutdown.load(Ordering::Acquire) {
        if interrupts.load(Ordering::Acquire) && motion.load(Ordering::Acquire) {
            port.step_pulse(&pulse);
            port.probe_sample(false);
        }
        thread::sleep(interval);
    }
}

fn realtime_input_loop(port: InterruptPort<'static>, interrupts: &AtomicBool) {
    for byte in io::stdin().lock().bytes() {
        let Ok(byte) = byte else {
            break;
        };
        if !interrupts.load(Ordering::Acquire) {
            continue;
        }
        if let Some(request) = realtime_request(byte) {
            request.dispatch(port);
        }
    }
}

// ─── CPU Pinning ────────────────────────────────────────────────────

/// Pin the process to one core.
#[cfg(target_os = "linux")]
pub fn pin_to_core(core: usize) -> Result<(), SimError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(core)
        .map_err(|e| SimError::Affinity(format!("CpuSet::set({core}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| SimError::Affinity(format!("sched_setaffinity failed: {e}")))?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_core(core: usize) -> Result<(), SimError> {
    warn!("CPU pinning not supported on this platform (core {core} ignored)");
    Ok(())
}
