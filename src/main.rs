//! Serial Sim - serial line collector and replayer
//!
//! Opens up to four serial ports matching the configured pattern and either
//! records the lines they produce or plays recorded lines back to them.

use anyhow::Context;
use clap::Parser;
use serial_sim_core::config::SimConfig;
use serial_sim_core::core::line_store::LineStore;
use serial_sim_core::core::port_loop::{Mode, PortLoop};
use serial_sim_core::core::registry::PortRegistry;
use serial_sim_core::{CliResult, VERSION};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Serial Sim CLI
#[derive(Parser, Debug)]
#[command(
    name = "serial-sim",
    version,
    about = "Collect lines from serial ports and replay them later",
    long_about = None
)]
struct Cli {
    /// Configuration file (default: ./config.toml, then the user config directory)
    #[arg(short, long, env = "SERIAL_SIM_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// List serial ports matching the configured pattern and exit
    #[arg(long)]
    list_ports: bool,
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let loaded = SimConfig::load(cli.config.as_deref())?;
    match &loaded.source {
        Some(path) => info!("Using configuration {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }
    let config = loaded.config;

    let registry = PortRegistry::new(config.device_pattern()?, config.slot_settings(), config.port_timeout());

    if cli.list_ports {
        for path in registry.discover() {
            println!("{path}");
        }
        return Ok(());
    }

    info!("Setting up system serial ports...");
    let mut ports = registry.open().ports;

    let store = LineStore::new(&config.mode.log_dir);
    let mode = config.operating_mode();
    if mode == Mode::Collection {
        std::fs::create_dir_all(store.dir())
            .with_context(|| format!("Failed to create log directory {}", store.dir().display()))?;
    }
    info!("Mode: {}, line logs in {}", mode, store.dir().display());

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current pass");
            token.cancel();
        }
    });

    let mut port_loop = PortLoop::new(&mut ports, &store, mode, config.tx_interval());
    port_loop.run(&shutdown).await;

    // Dropping the set closes every port
    drop(ports);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("Starting Serial Sim v{}", VERSION);

    let result = CliResult::from(run(&cli).await);
    if !result.is_success() {
        error!("{}", result.summary());
    }
    result.to_exit_code()
}
