//! # Jog Simulator
//!
//! Runs the proportional jog service against a simulated grblHAL-class
//! machine, driven by a scripted on-screen joystick that pushes into the
//! travel limit and sweeps along it.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 5 s run, built-in machine
//! jog_sim
//!
//! # Custom config, faster feed, debug logs
//! jog_sim --config jog_sim/config/jog.toml --feed-rate 3000 -v
//!
//! # JSON logs for ingestion
//! jog_sim --json --duration-ms 10000
//! ```

mod config;
mod machine;
mod script;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use jog_common::config::{ConfigError, ConfigLoader, LogLevel};
use jog_common::settings::JogMode;
use jog_control::drivers::VirtualJoystick;
use jog_control::service::JogService;
use jog_control::sink::ChannelSink;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::SimConfig;
use crate::machine::SimMachine;

/// Interval between scripted joystick samples.
const SAMPLE_PERIOD: Duration = Duration::from_millis(20);

const JOYSTICK_ID: &str = "sim-joystick";

/// Jog Simulator - proportional jogging against a simulated machine
#[derive(Parser, Debug)]
#[command(name = "jog_sim")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Proportional jog service against a simulated grblHAL machine")]
#[command(long_about = None)]
struct Args {
    /// Path to the simulator config (jog service sections plus [machine]).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Length of the joystick script in milliseconds
    #[arg(short, long, default_value_t = 5000)]
    duration_ms: u64,

    /// Feed rate at full deflection [mm/min], overrides the config
    #[arg(short, long)]
    feed_rate: Option<f64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = load_config(&args);

    let level = config
        .as_ref()
        .map(|c| c.service.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    let result = match config {
        Ok(config) => run(args, config).await,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!("Jog simulator failed: {}", e);
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<SimConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    config.service.defaults.jog.mode = JogMode::Joystick;
    if let Some(feed_rate) = args.feed_rate {
        config.service.defaults.jog.selected_feed_rate = feed_rate;
    }
    config.validate()?;
    Ok(config)
}

async fn run(args: Args, config: SimConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Jog simulator v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.service.shared.service_name
    );
    info!(
        feed_rate = config.service.defaults.jog.selected_feed_rate,
        envelope = ?config.machine.envelope(),
        start = ?config.machine.start_position,
        "Machine configured"
    );

    // Machine side: state source and command transport.
    let sim = SimMachine::new(&config.machine);
    let (state_tx, state_rx) = watch::channel(sim.snapshot());
    let (sink, commands) = ChannelSink::channel();
    let machine_task = tokio::spawn(machine::run(
        sim,
        commands,
        state_tx,
        config.machine.report_period(),
    ));

    let (service, handle) = JogService::new(&config.service, Box::new(sink), state_rx);
    let service_task = tokio::spawn(service.run());

    let joystick = VirtualJoystick::new(JOYSTICK_ID);
    let control = joystick.control();
    handle.add_input_driver(Box::new(joystick)).await?;

    let mut script = tokio::spawn(script::drive(
        control,
        Duration::from_millis(args.duration_ms),
        SAMPLE_PERIOD,
    ));

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
            script.abort();
        }
        _ = &mut script => {}
    }

    // Drivers are disposed, motion stopped, then the sink drops and the
    // machine task drains.
    handle.shutdown().await?;
    service_task.await?;
    let sim = machine_task.await?;

    let snapshot = handle.snapshot();
    info!(
        state = ?snapshot.state,
        position = ?sim.position(),
        stats = ?sim.stats(),
        "Jog simulator shutdown complete"
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Setup tracing subscriber from CLI flags and the configured level.
///
/// `RUST_LOG` wins over both; `--verbose` raises the default to DEBUG.
fn setup_tracing(args: &Args, level: LogLevel) {
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        level
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
