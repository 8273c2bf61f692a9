use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

use vidacomdeus_common::validation::is_valid_email;
use vidacomdeus_common::PatientStatus;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::store::patients::{
    overview as build_overview, DashboardOverview, PatientConfig, PatientIntake, PatientSummary,
    PatientUpdate, SessionInput, TherapySession,
};
use crate::AppState;

use super::ApiJson;

#[derive(Debug, Serialize)]
pub struct PatientListResponse {
    pub patients: Vec<PatientSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<TherapySession>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: PatientStatus,
}

#[derive(Debug, Deserialize)]
pub struct LimitUpdate {
    pub messages_limit: i64,
}

fn validate_limit(messages_limit: i64) -> ApiResult<()> {
    if messages_limit < 0 {
        return Err(ApiError::validation("O limite de mensagens não pode ser negativo."));
    }
    Ok(())
}

fn validate_intake(intake: &PatientIntake) -> ApiResult<()> {
    if intake.name.trim().is_empty() {
        return Err(ApiError::validation("O nome do paciente é obrigatório."));
    }
    if !is_valid_email(&intake.email) {
        return Err(ApiError::validation("Email inválido."));
    }
    validate_limit(intake.messages_limit)
}

pub async fn overview(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<Json<DashboardOverview>> {
    let patients = state.patients.list().await?;
    Ok(Json(build_overview(&patients)))
}

pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<Json<PatientListResponse>> {
    let patients: Vec<PatientSummary> = state
        .patients
        .list()
        .await?
        .iter()
        .map(PatientSummary::from)
        .collect();
    Ok(Json(PatientListResponse {
        total: patients.len(),
        patients,
    }))
}

pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiJson(intake): ApiJson<PatientIntake>,
) -> ApiResult<impl IntoResponse> {
    validate_intake(&intake)?;
    let patient = state.patients.create(intake).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PatientConfig>> {
    Ok(Json(state.patients.get(&id).await?))
}

pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<PatientUpdate>,
) -> ApiResult<Json<PatientConfig>> {
    Ok(Json(state.patients.update(&id, update).await?))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusUpdate>,
) -> ApiResult<Json<PatientConfig>> {
    Ok(Json(state.patients.set_status(&id, req.status).await?))
}

pub async fn update_limit(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<LimitUpdate>,
) -> ApiResult<Json<PatientConfig>> {
    validate_limit(req.messages_limit)?;
    Ok(Json(state.patients.set_limit(&id, req.messages_limit).await?))
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionListResponse>> {
    let sessions = state.patients.get(&id).await?.sessions;
    Ok(Json(SessionListResponse {
        total: sessions.len(),
        sessions,
    }))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<SessionInput>,
) -> ApiResult<impl IntoResponse> {
    let session = state.patients.add_session(&id, input).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn update_session(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path((id, session_id)): Path<(String, String)>,
    ApiJson(input): ApiJson<SessionInput>,
) -> ApiResult<Json<TherapySession>> {
    Ok(Json(state.patients.update_session(&id, &session_id, input).await?))
}
