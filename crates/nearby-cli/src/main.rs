//! nearby - find a master nearby from the terminal.
//!
//! The app shell is kept in a versioned offline cache; `sync` installs the
//! configured generation and evicts older ones, and every other command
//! reads through it.

mod cli;
mod commands;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use nearby_core::Config;

/// Initialize the tracing subscriber for logging.
/// The returned guard must live until exit so buffered file logs are flushed.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // RUST_LOG wins over -v flags
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "nearby.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };
    if let Some(ref origin) = cli.origin {
        config.origin = origin.clone();
    }
    if let Some(ref version) = cli.cache_version {
        config.version = version.clone();
    }
    debug!(origin = %config.origin, version = %config.version, assets = config.assets.len(), "Configuration loaded");
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.log_dir.as_deref());
    info!("nearby starting");

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Sync => commands::sync(&config).await,
        Commands::Status => commands::status(&config).await,
        Commands::Get(args) => commands::get(&config, args).await,
        Commands::Search(args) => commands::search(&config, args).await,
        Commands::Clear => commands::clear(&config).await,
    }
}
