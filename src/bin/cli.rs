//! Ranked match harvester CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use harvester::{
    error::Result,
    models::Config,
    pipeline::{self, Harvester},
    storage::{MatchStore, SqliteStore},
};
use tokio::sync::watch;

/// harvester - Ranked match history harvester
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Harvests ranked match history into SQLite"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest continuously until interrupted (Ctrl-C)
    Run,

    /// Run a single scheduling round
    Once,

    /// Validate the configuration file
    Validate,

    /// Show catalog statistics
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Flip the returned flag on Ctrl-C.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Interrupt received, finishing in-flight matches...");
                let _ = tx.send(true);
            }
            Err(e) => log::error!("Cannot listen for Ctrl-C: {}", e),
        }
    });
    rx
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };
    init_logging(cli.verbose, &config.logging.level);

    if cli.config.exists() {
        log::info!("Loaded configuration from {}", cli.config.display());
    } else {
        log::warn!(
            "Config file {} not found. Using defaults.",
            cli.config.display()
        );
    }

    match cli.command {
        Command::Run => {
            log::info!("Harvester starting...");
            pipeline::run_harvest(&config, shutdown_signal()).await?;
            log::info!("Harvest stopped.");
        }

        Command::Once => {
            let harvester = Harvester::from_config(&config).await?;
            let report = harvester.run_once(shutdown_signal()).await?;
            log::info!(
                "Round complete for {} ({} matches stored)",
                report.player,
                report.batch.persisted
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            match config.api.resolve_api_key() {
                Ok(_) => log::info!("✓ API key available"),
                Err(e) => log::warn!("{}", e),
            }
            log::info!("✓ Config OK");
        }

        Command::Info => {
            log::info!("Database: {}", config.storage.database_path);

            let store = SqliteStore::open(&config.storage.database_path).await?;
            let stats = store.catalog_stats().await;
            store.close().await?;
            let stats = stats?;

            log::info!("Tracked players: {}", stats.tracked_players);
            log::info!("Rated players:   {}", stats.rated_players);
            log::info!("Matches:         {}", stats.matches);
            log::info!("Stats rows:      {}", stats.stats_rows);
            match stats.oldest {
                Some(oldest) => log::info!(
                    "Next up: {} (last scanned {})",
                    oldest.player,
                    oldest.last_scanned
                ),
                None => log::info!("Catalog is empty."),
            }
        }
    }

    Ok(())
}
