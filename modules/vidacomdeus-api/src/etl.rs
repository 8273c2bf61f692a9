//! Devotional ingestion: scrape the source, upsert posts and keep the run history.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use vidacomdeus_common::time::now_iso;
use vidacomdeus_common::EtlStatus;
use vidacomdeus_scraper::PostSource;

use crate::db::models::post::Post;
use crate::store::{EtlRun, EtlRunLog};

pub const RUN_NAME: &str = "Devotional Sync";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Success,
    Warning,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct EtlReport {
    pub status: ReportStatus,
    pub started_at: String,
    pub finished_at: String,
    pub posts_collected: usize,
    pub new_posts: usize,
    pub message: String,
    pub error: Option<String>,
}

impl EtlReport {
    /// Status and error recorded in the run history. A pass that collected nothing counts as failed.
    pub fn run_outcome(&self) -> (EtlStatus, Option<String>) {
        match self.status {
            ReportStatus::Success => (EtlStatus::Success, None),
            ReportStatus::Warning | ReportStatus::Failed => (
                EtlStatus::Failed,
                Some(self.error.clone().unwrap_or_else(|| self.message.clone())),
            ),
        }
    }
}

fn summarize(posts_collected: usize, new_posts: usize, source_url: &str) -> (ReportStatus, String) {
    if posts_collected > 0 {
        (
            ReportStatus::Success,
            format!("{posts_collected} reflexões coletadas ({new_posts} novas) de {source_url}"),
        )
    } else {
        (
            ReportStatus::Warning,
            "Nenhuma reflexão encontrada. Verifique a estrutura da página.".to_string(),
        )
    }
}

/// One scrape-and-upsert pass. Never fails: problems are reported in the returned report.
pub async fn run_etl(pool: &PgPool, source: &dyn PostSource) -> EtlReport {
    let started_at = now_iso();
    let source_url = source.source_url().to_string();

    let posts = match source.fetch_posts().await {
        Ok(posts) => posts,
        Err(e) => {
            warn!(source = %source_url, error = %e, "Scrape failed");
            return EtlReport {
                status: ReportStatus::Failed,
                started_at,
                finished_at: now_iso(),
                posts_collected: 0,
                new_posts: 0,
                message: format!("Falha ao acessar {source_url}"),
                error: Some(e.to_string()),
            };
        }
    };

    let mut posts_collected = 0;
    let mut new_posts = 0;
    for post in &posts {
        match Post::upsert(post, pool).await {
            Ok((_, created)) => {
                posts_collected += 1;
                if created {
                    new_posts += 1;
                }
            }
            Err(e) => warn!(source_url = %post.source_url, error = %e, "Failed to store post"),
        }
    }

    let (status, message) = summarize(posts_collected, new_posts, &source_url);
    info!(posts_collected, new_posts, "ETL pass finished");

    EtlReport {
        status,
        started_at,
        finished_at: now_iso(),
        posts_collected,
        new_posts,
        message,
        error: None,
    }
}

/// Allows a single ETL run at a time.
#[derive(Debug, Clone, Default)]
pub struct EtlGuard {
    running: Arc<AtomicBool>,
}

/// Held for the duration of a run; releases the guard on drop.
#[derive(Debug)]
pub struct EtlPermit {
    running: Arc<AtomicBool>,
}

impl EtlGuard {
    pub fn try_start(&self) -> Option<EtlPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| EtlPermit {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for EtlPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

pub fn format_duration(elapsed: Duration) -> String {
    format!("{}s", elapsed.as_secs())
}

/// A fresh history entry in the running state.
pub fn new_run() -> EtlRun {
    let id = Uuid::new_v4().simple().to_string();
    EtlRun {
        id: format!("etl-{}", &id[..8]),
        name: RUN_NAME.to_string(),
        status: EtlStatus::Running,
        started_at: now_iso(),
        duration: "-".to_string(),
        error: None,
    }
}

/// Run the ETL for an already recorded run and write its outcome back to the history.
pub async fn execute(
    run_id: String,
    permit: EtlPermit,
    pool: PgPool,
    source: Arc<dyn PostSource>,
    log: EtlRunLog,
) -> EtlReport {
    let clock = Instant::now();
    let report = run_etl(&pool, source.as_ref()).await;
    let (status, error) = report.run_outcome();

    match log
        .finish(&run_id, status, format_duration(clock.elapsed()), error)
        .await
    {
        Ok(true) => info!(run_id = %run_id, status = %status, "ETL run recorded"),
        Ok(false) => warn!(run_id = %run_id, "ETL run no longer in history"),
        Err(e) => warn!(run_id = %run_id, error = %e, "Failed to record ETL outcome"),
    }

    drop(permit);
    report
}
