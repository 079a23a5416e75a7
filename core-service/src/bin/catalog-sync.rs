//! catalog-sync: operator trigger for the photo catalog publisher.
//!
//! Reads configuration from the environment (and a `.env` file when present),
//! runs the requested operation and prints its result as JSON on stdout.
//! Logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use core_service::{bootstrap_database, build_object_store, CatalogConfig, CatalogService};
use serde_json::json;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "catalog-sync")]
#[command(author, version, about = "Publish the photo catalog to object storage")]
#[command(propagate_version = true)]
struct Cli {
    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Log output format (pretty, json, compact)
    #[arg(long, env = "LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation pass against the object store
    Reconcile {
        /// Abandon the pass after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// Download the published snapshot over the local database
    Bootstrap,

    /// Record new image files and forget vanished ones
    Index,

    /// Generate thumbnails for every image under the photos root
    Thumbnails {
        /// Re-render thumbnails that already exist
        #[arg(short, long)]
        force: bool,
    },

    /// Remove cached thumbnails whose original is gone
    CleanupThumbnails,
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open(config: CatalogConfig) -> anyhow::Result<CatalogService> {
    CatalogService::open(config)
        .await
        .context("Failed to open catalog")
}

async fn run(command: Commands) -> anyhow::Result<ExitCode> {
    let config = CatalogConfig::from_env().context("Invalid catalog configuration")?;

    match command {
        Commands::Reconcile { deadline_secs } => {
            let service = open(config).await?;
            let report = match deadline_secs {
                Some(secs) => {
                    service
                        .reconcile_with_deadline(Duration::from_secs(secs))
                        .await
                }
                None => service.reconcile().await,
            };
            print_json(&serde_json::to_value(&report)?)?;
            if !report.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        // Replaces the database file, so it runs before the catalog is opened
        Commands::Bootstrap => {
            let store = build_object_store(&config)?;
            let outcome = bootstrap_database(&config, store).await?;
            print_json(&json!({ "outcome": format!("{:?}", outcome) }))?;
        }
        Commands::Index => {
            let summary = open(config).await?.index_library().await?;
            print_json(&json!({ "added": summary.added, "removed": summary.removed }))?;
        }
        Commands::Thumbnails { force } => {
            let summary = open(config).await?.generate_thumbnails(force).await?;
            print_json(&json!({
                "generated": summary.generated,
                "skipped": summary.skipped,
                "failed": summary.failed,
                "total": summary.total,
            }))?;
        }
        Commands::CleanupThumbnails => {
            let removed = open(config).await?.cleanup_thumbnails().await?;
            print_json(&json!({ "removed": removed }))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut logging = LoggingConfig::default().with_level(cli.log_level);
    if let Some(format) = cli.log_format {
        logging = logging.with_format(format);
    }
    if let Err(e) = init_logging(logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
