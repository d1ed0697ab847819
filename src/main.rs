use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use mongo_migrate::cli::{self, Cli, Command};
use mongo_migrate::config::AppConfig;
use mongo_migrate::db;
use mongo_migrate::logging;
use mongo_migrate::orchestrator::Orchestrator;
use mongo_migrate::output::ConsoleSink;
use mongo_migrate::registry::Registry;
use mongo_migrate::scripts;
use mongo_migrate::storage::MongoVersionStorage;

#[tokio::main]
async fn main() {
    logging::set_panic_hook();
    logging::init_logging_with_fallback();
    dotenvy::dotenv().ok();

    if let Err(err) = run().await {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Command::Generate { name } => cli::generate::run(&config.registry_settings(), &name),
        Command::Status {
            show_versions,
            json,
        } => {
            let orchestrator = build_orchestrator(&config).await?;
            cli::status::run(orchestrator.registry(), show_versions, json)
        }
        Command::Migrate {
            version,
            no_interaction,
        } => {
            let mut orchestrator = build_orchestrator(&config).await?;
            cli::migrate::run(&mut orchestrator, version, no_interaction).await
        }
        Command::Version {
            version,
            add,
            delete,
        } => {
            let mut orchestrator = build_orchestrator(&config).await?;
            cli::version::run(&mut orchestrator, version, add, delete).await
        }
    }
}

async fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    let client = db::connect(config)
        .await
        .context("failed to configure MongoDB client")?;
    let database = client.database(&config.database);
    let storage = MongoVersionStorage::new(&database, &config.collection);
    storage
        .ensure_index()
        .await
        .context("failed to ensure the version index")?;
    let registry = Registry::load(config.registry_settings(), scripts::all(), &storage).await?;
    Ok(Orchestrator::new(
        registry,
        database,
        Arc::new(storage),
        Arc::new(ConsoleSink),
    ))
}
