//! Headless fleet engine runner.
//!
//! # Usage
//!
//! ```bash
//! fleet_headless decide --snapshot s.json [--config c.ron] [--memory m.bin] [--seed N]
//! fleet_headless replay --dir snapshots/ [--config c.ron] [--seed N]
//! ```
//!
//! Logs go to stderr and honor `RUST_LOG`; stdout carries only JSON lines.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fleet_core::engine::FleetEngine;
use fleet_headless::loader::load_config;
use fleet_headless::{decide_file, replay_dir, Result};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "fleet_headless")]
#[command(about = "Run the fleet decision engine on snapshot files")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration (RON); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for shipyard and defender choices
    #[arg(long, global = true, default_value = "0")]
    seed: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide a single snapshot
    Decide {
        /// Snapshot JSON file
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Memory file to read before and write after deciding
        #[arg(short, long)]
        memory: Option<PathBuf>,
    },

    /// Replay every *.json snapshot in a directory, threading memory
    Replay {
        /// Directory of snapshot files
        #[arg(short, long)]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "fleet_headless failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let engine = FleetEngine::new(load_config(cli.config.as_deref())?)?;
    let mut rng = SmallRng::seed_from_u64(cli.seed);

    match cli.command {
        Commands::Decide { snapshot, memory } => {
            let stdout = io::stdout();
            let decision = decide_file(&engine, &snapshot, memory.as_deref(), &mut rng, &mut stdout.lock())?;
            tracing::info!(commands = decision.batch.len(), "Decided");
        }
        Commands::Replay { dir } => {
            let summary = replay_dir(&engine, &dir, &mut rng, io::stdout().lock())?;
            if summary.decided == 0 {
                tracing::warn!(?summary, "Replay decided no ticks");
            }
        }
    }
    Ok(())
}
