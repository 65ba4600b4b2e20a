//! lapse - in-memory session store host
//!
//! Main entry point for the lapse CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;

mod commands;
mod config;
mod shutdown;

use commands::{demo, soak};
use config::LapseConfig;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// lapse - in-memory session store with automatic expiry
#[derive(Parser)]
#[command(name = "lapse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ./lapse.toml, then ~/.config/lapse/config.toml)
    #[arg(long, global = true, env = "LAPSE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, update and read a session, then watch it expire
    Demo(demo::DemoArgs),

    /// Hammer a shared store from concurrent workers and verify consistency
    Soak(soak::SoakArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Console (human-readable, stderr) plus an optional rotating JSON file.
///
/// `RUST_LOG` overrides the console filter.
fn init_tracing(config: &LapseConfig, verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lapse={level},lapse_session={level},warn")));

    let (file_layer, guard) = match &config.logging.directory {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "lapse.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new("lapse=trace,lapse_session=trace,info"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = config::load_config(cli.config.as_deref())?;
    let _guard = init_tracing(&loaded.config, cli.verbose);

    match &loaded.source {
        Some(path) => tracing::debug!(path = %path.display(), "Loaded config"),
        None => tracing::debug!("No config file found, using defaults"),
    }

    let ctx = commands::Context {
        config: loaded.config,
        json_output: cli.json,
        verbose: cli.verbose,
        shutdown: shutdown::install(),
    };

    match cli.command {
        Commands::Demo(args) => demo::run(args, &ctx).await,
        Commands::Soak(args) => soak::run(args, &ctx).await,
    }
}
