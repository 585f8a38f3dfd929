//! `kesi`: runs the harvesting pipeline and inspects its state.

mod cli;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use kesi_core::config::load_dotenv;
use kesi_core::KesiConfig;
use kesi_pipeline::{CheckpointStore, FileCheckpointStore, Pipeline};

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = CliArgs::parse();

    let config = KesiConfig::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    match args.command {
        Command::Run => run(&config).await,
        Command::Check => {
            check(&config);
            Ok(())
        }
        Command::Checkpoints => checkpoints(&config),
    }
}

async fn run(config: &KesiConfig) -> Result<()> {
    config.log_summary();
    let pipeline = Pipeline::from_config(config)
        .await
        .context("failed to start pipeline")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("interrupt received");

    let stats = pipeline.shutdown().await;
    info!(
        attempted = stats.attempted,
        delivered = stats.delivered,
        failed = stats.failed,
        skipped = stats.skipped,
        "kesi exited cleanly"
    );
    Ok(())
}

fn check(config: &KesiConfig) {
    println!("configuration ok, {} source(s)", config.sources.len());
    for source in config.knowledge_sources() {
        println!(
            "  {:<16} {:<8} {:<8} {}",
            source.id, source.kind, source.startup, source.uri
        );
    }
}

fn checkpoints(config: &KesiConfig) -> Result<()> {
    let store = FileCheckpointStore::open(&config.state.checkpoints_path).with_context(|| {
        format!(
            "failed to read {}",
            config.state.checkpoints_path.display()
        )
    })?;
    let mut persisted: BTreeMap<_, _> = store.load_all()?;

    for source in config.knowledge_sources() {
        match persisted.remove(source.locator()) {
            Some(ts) => println!("{:<16} {}  {}", source.id, ts.to_rfc3339(), source.uri),
            None => println!("{:<16} {:<25}  {}", source.id, "never sent", source.uri),
        }
    }
    for (locator, ts) in persisted {
        println!("{:<16} {}  {}", "(unconfigured)", ts.to_rfc3339(), locator);
    }
    Ok(())
}
