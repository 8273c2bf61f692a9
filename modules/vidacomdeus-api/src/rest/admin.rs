use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{info, warn};

use vidacomdeus_common::time::now_iso;
use vidacomdeus_common::{AlertLevel, EtlStatus};

use crate::auth::AuthUser;
use crate::db::models::storage::{GrowthMetric, StorageMetric, StorageSnapshot};
use crate::error::{ApiError, ApiResult};
use crate::etl;
use crate::store::EtlRun;
use crate::AppState;

const CRITICAL_USAGE_PERCENT: f64 = 90.0;
const WARNING_USAGE_PERCENT: f64 = 70.0;

#[derive(Debug, Serialize)]
pub struct EtlRunsResponse {
    pub runs: Vec<EtlRun>,
}

#[derive(Debug, Serialize)]
pub struct EtlExecuteResponse {
    pub run_id: String,
    pub message: String,
    pub status: EtlStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemAlert {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub level: AlertLevel,
    pub triggered_at: String,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<SystemAlert>,
}

async fn current_storage(state: &AppState) -> ApiResult<StorageMetric> {
    let used = StorageSnapshot::database_size(&state.pool).await?;
    Ok(StorageMetric::new(used, state.config.render_db_size_bytes))
}

pub async fn storage_metrics(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<Json<StorageMetric>> {
    Ok(Json(current_storage(&state).await?))
}

pub async fn growth_metrics(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<Json<GrowthMetric>> {
    let snapshots = StorageSnapshot::daily_last_week(&state.pool).await?;
    Ok(Json(GrowthMetric::from_snapshots(&snapshots)))
}

pub async fn etl_runs(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<Json<EtlRunsResponse>> {
    Ok(Json(EtlRunsResponse {
        runs: state.etl_runs.list().await?,
    }))
}

pub async fn execute_etl(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let permit = state
        .etl_guard
        .try_start()
        .ok_or_else(|| ApiError::Conflict("Uma execução de ETL já está em andamento.".to_string()))?;

    let run = etl::new_run();
    let run_id = run.id.clone();
    state.etl_runs.record(run).await?;
    info!(run_id = %run_id, user_id = %user.user_id, "ETL run started");

    tokio::spawn(etl::execute(
        run_id.clone(),
        permit,
        state.pool.clone(),
        state.source.clone(),
        state.etl_runs.clone(),
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(EtlExecuteResponse {
            run_id,
            message: "ETL iniciado com sucesso.".to_string(),
            status: EtlStatus::Running,
        }),
    ))
}

fn storage_alert(storage: &StorageMetric, now: &str) -> Option<SystemAlert> {
    let (level, threshold) = if storage.usage_percent >= CRITICAL_USAGE_PERCENT {
        (AlertLevel::Critical, CRITICAL_USAGE_PERCENT)
    } else if storage.usage_percent >= WARNING_USAGE_PERCENT {
        (AlertLevel::Warning, WARNING_USAGE_PERCENT)
    } else {
        return None;
    };

    Some(SystemAlert {
        id: format!("alert-storage-{}", level.as_str()),
        title: format!("Armazenamento > {threshold:.0}%"),
        subtitle: format!(
            "{:.1}% usado ({:.2}GB de {:.2}GB)",
            storage.usage_percent, storage.used_gb, storage.total_gb
        ),
        level,
        triggered_at: now.to_string(),
    })
}

fn etl_alert(run: &EtlRun) -> Option<SystemAlert> {
    let (level, title, subtitle) = match run.status {
        EtlStatus::Failed => (
            AlertLevel::Error,
            "Falha no ETL",
            run.error.clone().unwrap_or_else(|| run.name.clone()),
        ),
        EtlStatus::Success => (
            AlertLevel::Info,
            "ETL concluído",
            format!("{} em {}", run.name, run.duration),
        ),
        EtlStatus::Running | EtlStatus::Pending => return None,
    };

    Some(SystemAlert {
        id: format!("alert-{}", run.id),
        title: title.to_string(),
        subtitle,
        level,
        triggered_at: run.started_at.clone(),
    })
}

/// Alerts from the current storage reading and the latest ETL run, most severe first.
pub fn build_alerts(
    storage: Option<&StorageMetric>,
    latest_run: Option<&EtlRun>,
    now: &str,
) -> Vec<SystemAlert> {
    let mut alerts: Vec<SystemAlert> = storage
        .and_then(|s| storage_alert(s, now))
        .into_iter()
        .chain(latest_run.and_then(etl_alert))
        .collect();
    alerts.sort_by(|a, b| b.level.cmp(&a.level));
    alerts
}

pub async fn alerts(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<Json<AlertsResponse>> {
    let storage = match current_storage(&state).await {
        Ok(metric) => Some(metric),
        Err(e) => {
            warn!(error = %e, "Storage reading unavailable for alerts");
            None
        }
    };
    let latest = state.etl_runs.latest().await?;

    Ok(Json(AlertsResponse {
        alerts: build_alerts(storage.as_ref(), latest.as_ref(), &now_iso()),
    }))
}
