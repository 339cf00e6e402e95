//! Sublift - Unattended subtitle acquisition and translation
//!
//! Walks a media library, finds a usable source-language subtitle for every
//! file (sidecar or embedded stream) and has it translated by a remote
//! translation service, writing `<basename>.<target>.srt` beside the media.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use sublift::cli::Args;
use sublift::config::Config;
use sublift::error::SubliftError;
use sublift::workflow::Workflow;

const DEFAULT_CONFIG_FILE: &str = "sublift.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                Config::from_file(DEFAULT_CONFIG_FILE)
                    .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_FILE))?
            } else {
                Config::default()
            }
        }
    };
    config.apply_overrides(&args.overrides());
    config.validate()?;

    if args.dump_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    // Setup logging to both console and file
    let _guard = setup_logging(args.verbose)?;
    info!("Starting Sublift");

    let root = args
        .root
        .as_deref()
        .ok_or_else(|| SubliftError::Precondition("No library root given".to_string()))?;
    if !root.is_dir() {
        return Err(SubliftError::Precondition(format!("{} is not a directory", root.display())).into());
    }

    info!(
        "Translating {} -> {} via {} (engine {})",
        config.languages.source, config.languages.target, config.api.base_url, config.api.engine
    );

    let workflow = Workflow::new(config).await?;
    let summary = workflow.process_directory(root).await?;

    println!("{}", summary);
    Ok(())
}

/// Setup logging to both console and a daily rolling file under `.sublift/log`.
/// The returned guard flushes the file writer when dropped.
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".sublift").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "sublift.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}
