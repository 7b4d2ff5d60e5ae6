//! AgeGate CLI — run and inspect on-device age verifications.
//!
//! Subcommands: init, verify, status, proof, stats, history, clear.
//! Results are printed as JSON on stdout; logs go to stderr.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::{AgeGateConfig, LoggingConfig};

/// AgeGate — privacy-preserving age verification that never leaves the device.
#[derive(Parser, Debug)]
#[command(name = "agegate", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, global = true, default_value = "agegate.toml")]
    config: PathBuf,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration with a fresh device id.
    Init(commands::init::InitArgs),
    /// Run one verification.
    Verify(commands::verify::VerifyArgs),
    /// Show the current verification status.
    Status(commands::status::StatusArgs),
    /// Show the anonymous proof of the latest verification.
    Proof(commands::proof::ProofArgs),
    /// Show success and failure counts.
    Stats(commands::stats::StatsArgs),
    /// List retained verification attempts.
    History(commands::history::HistoryArgs),
    /// Erase all stored verification data.
    Clear(commands::clear::ClearArgs),
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AgeGateConfig::load(&cli.config)?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_tracing(&config.logging);

    match &cli.command {
        Commands::Init(args) => commands::init::run(args, &cli.config),
        Commands::Verify(args) => commands::verify::run(args, &config).await,
        Commands::Status(args) => commands::status::run(args, &config).await,
        Commands::Proof(args) => commands::proof::run(args, &config).await,
        Commands::Stats(args) => commands::stats::run(args, &config).await,
        Commands::History(args) => commands::history::run(args, &config).await,
        Commands::Clear(args) => commands::clear::run(args, &config).await,
    }
}
