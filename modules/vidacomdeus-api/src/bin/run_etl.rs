//! One-shot devotional sync from the command line.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use vidacomdeus_api::etl::{self, EtlGuard, ReportStatus};
use vidacomdeus_api::store::{EtlRunLog, JsonStore};
use vidacomdeus_api::{init_tracing, MIGRATOR};
use vidacomdeus_common::Config;
use vidacomdeus_scraper::{DevotionalScraper, PostSource};

#[derive(Parser)]
#[command(name = "run-etl")]
#[command(about = "Scrape devotionals and upsert them into the database")]
#[command(version)]
struct Args {
    /// Listing page to scrape (defaults to SCRAPER_SOURCE_URL)
    #[arg(long, env = "SCRAPER_SOURCE_URL")]
    source_url: Option<String>,

    /// Assume the schema is already current
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing()?;
    let args = Args::parse();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("connecting to the database")?;

    if !args.skip_migrations {
        MIGRATOR.run(&pool).await?;
    }

    let source_url = args.source_url.unwrap_or_else(|| config.scraper_source_url.clone());
    let source: Arc<dyn PostSource> = Arc::new(DevotionalScraper::new(source_url)?);

    let store = Arc::new(JsonStore::open(config.data_dir.clone()).await?);
    let log = EtlRunLog::new(store);

    let permit = EtlGuard::default()
        .try_start()
        .context("ETL guard unexpectedly held")?;
    let run = etl::new_run();
    let run_id = run.id.clone();
    log.record(run).await?;
    info!(run_id = %run_id, url = %source.source_url(), "ETL run started");

    let report = etl::execute(run_id, permit, pool, source, log).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(match report.status {
        ReportStatus::Failed => ExitCode::FAILURE,
        ReportStatus::Success | ReportStatus::Warning => ExitCode::SUCCESS,
    })
}
