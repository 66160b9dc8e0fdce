use std::{path::PathBuf, sync::Arc};

use ::tracing::{error, info, info_span};
use clap::{Parser, Subcommand};
use service::Service;

mod boot;
mod config;
mod http_objects;
mod migration;
mod provision;
mod provision_test;
mod records;
mod routes;
mod service;
mod tracing;
use tracing::setup_tracing;

#[cfg(test)]
mod testing;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "config file", help = "Path to config file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate externally-hosted hero images into managed storage.
    Migrate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => match config::ServerConfig::from_path(path.to_str().unwrap()) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("error loading config: {:#}", err);
                std::process::exit(1);
            }
        },
        None => config::ServerConfig::default(),
    };

    if let Err(err) = setup_tracing(&config) {
        eprintln!("error setting up tracing: {:#}", err);
        std::process::exit(1);
    }

    let root_span = info_span!("assets-server", env = config.env);
    let _guard = root_span.enter();

    match cli.command {
        Some(Command::Migrate) => {
            if let Err(err) = run_migration(config).await {
                error!("migration failed: {:#}", err);
                std::process::exit(1);
            }
        }
        None => {
            let service = match Service::new(config) {
                Ok(service) => service,
                Err(err) => {
                    error!("error creating service: {:#}", err);
                    std::process::exit(1);
                }
            };
            if let Err(err) = service.start().await {
                error!("error starting service: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}

/// Operator entry point: one sequential migration pass. Missing credentials
/// are fatal before any side effect; per-record failures only show up in
/// the report.
async fn run_migration(config: config::ServerConfig) -> anyhow::Result<()> {
    config.require_credentials()?;

    let storage: Arc<dyn storage_client::ObjectStoreClient> =
        Arc::new(storage_client::HttpStorageClient::new(&config.storage)?);
    let records: Arc<dyn records::RecordStore> = Arc::new(records::HttpRecordStore::new(
        &config.storage,
    )?);
    let fetcher = Arc::new(migration::HttpImageFetcher::new());

    let migrator = migration::Migrator::new(storage, records, fetcher);
    let report = migrator.migrate_all().await?;
    info!("hero image migration report: {}", report.summary());
    for result in &report.results {
        info!(
            id = result.id,
            slug = result.slug,
            outcome = result.outcome.as_ref(),
            detail = result.detail.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}
