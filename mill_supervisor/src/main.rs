//! # Mill Supervisor
//!
//! Runs the reset sequencer against a simulated machine. Host threads play
//! the interrupt domain: a step generator and a stdin reader that turns
//! realtime bytes (`?`, `~`, `!`, `0x18`, override bytes) into bus flags.

use clap::Parser;
use mill_common::config::ConfigLoader;
use mill_common::supervisor::config::SupervisorConfig;
use mill_common::supervisor::flags::ExecState;
use mill_supervisor::sequencer::ResetSequencer;
use mill_supervisor::shared::SharedState;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

mod sim;

use sim::{SimForeground, SimHardware, SimMachine, pin_to_core};

/// Everything the interrupt domain touches lives for the whole process.
static SHARED: SharedState = SharedState::new();

/// Used when no configuration file is given.
const DEFAULT_CONFIG: &str = r#"
[shared]
service_name = "mill-sim"
"#;

/// Mill Supervisor: reset sequencer on a simulated machine
#[derive(Parser, Debug)]
#[command(name = "mill_supervisor")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "System-state supervisor running against a simulated machine")]
struct Args {
    /// Path to supervisor configuration TOML.
    config: Option<PathBuf>,

    /// Stop after this many reset iterations (default: run until Ctrl-C).
    #[arg(long, value_name = "N")]
    iterations: Option<u64>,

    /// CPU core to pin the process to.
    #[arg(long, value_name = "N")]
    cpu_core: Option<usize>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, None);
            error!("FATAL: {e}");
            process::exit(1);
        }
    };
    setup_tracing(&args, Some(&config));

    info!(
        "Mill Supervisor v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    if let Err(e) = run(&args, &config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Mill Supervisor shutdown complete");
}

fn load_config(args: &Args) -> Result<SupervisorConfig, Box<dyn std::error::Error>> {
    let config = match args.config {
        Some(ref path) => SupervisorConfig::load(path)?,
        None => SupervisorConfig::from_toml_str(DEFAULT_CONFIG)?,
    };
    config.validate()?;
    Ok(config)
}

fn run(args: &Args, config: &SupervisorConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(core) = args.cpu_core {
        pin_to_core(core)?;
        info!("Pinned to CPU core {core}");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let s = shutdown.clone();
    ctrlc::set_handler(move || {
        SHARED.interrupt_port().set_exec_state(ExecState::RESET);
        s.store(true, Ordering::SeqCst);
    })?;

    let motion = Arc::new(AtomicBool::new(false));
    let timing = &config.simulation;
    let mut hardware = SimHardware::spawn(
        &SHARED,
        config.settings,
        Duration::from_micros(timing.step_interval_us.into()),
        motion.clone(),
        shutdown.clone(),
    )?;

    let mut machine = SimMachine::new(motion.clone());
    let mut foreground = SimForeground::new(Duration::from_micros(timing.poll_interval_us.into()), motion);

    let mut sequencer = ResetSequencer::initialize(&SHARED, &mut hardware, config.policy);
    let limit = args.iterations;
    sequencer.run_while(&mut machine.collaborators(), &mut foreground, |seq| {
        !shutdown.load(Ordering::SeqCst) && limit.is_none_or(|n| seq.iterations() < n)
    });

    info!(
        "Stopped after {} reset iterations, machine position {:?} (planner {:?})",
        sequencer.iterations(),
        SHARED.machine_position.snapshot(),
        machine.planner.position()
    );
    hardware.shutdown();
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured
/// log level.
fn setup_tracing(args: &Args, config: Option<&SupervisorConfig>) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = match (args.verbose, config) {
        (false, Some(config)) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.shared.log_level.as_directive())),
        _ => EnvFilter::from_default_env().add_directive(level.into()),
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
