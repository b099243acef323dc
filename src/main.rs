//! xblock - one-click block and mute controls for the X timeline
//!
//! Command-line entry point: drives the action executor over the network,
//! annotates saved page snapshots and manages the external store.

mod cli;
mod cmd_action;
mod cmd_annotate;
mod cmd_store;

use std::sync::Arc;

use clap::Parser;
use tracing::{debug, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use xblock_config::{Config, ConfigLoader, ConfigValidator};
use xblock_store::{FileStore, KeyValueStore};

use crate::cli::{Cli, Commands};

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = ConfigLoader::data_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("xblock")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes the file writer on exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => ConfigLoader::default_path()?,
    };
    let config = ConfigLoader::load_or_default(&path)?;
    for warning in ConfigValidator::validate(&config).into_result()? {
        warn!(field = %warning.path, "{}", warning.message);
    }
    debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

async fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>, Box<dyn std::error::Error>> {
    let store = FileStore::open(config.storage.resolved_path()).await?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Action { verb, id } => cmd_action::handle_action(&config, &verb, &id).await,
        Commands::Check { id } => cmd_action::handle_check(&config, &id).await,
        Commands::Annotate { snapshot, tree } => {
            let store = open_store(&config).await?;
            cmd_annotate::handle_annotate(&config, store, &snapshot, tree).await
        }
        Commands::Stats { reset } => cmd_store::handle_stats(open_store(&config).await?, reset).await,
        Commands::Settings {
            show_block,
            show_mute,
            confirm_block_following,
        } => {
            let store = open_store(&config).await?;
            cmd_store::handle_settings(store, show_block, show_mute, confirm_block_following).await
        }
        Commands::Reset => cmd_store::handle_reset(open_store(&config).await?).await,
    }
}
