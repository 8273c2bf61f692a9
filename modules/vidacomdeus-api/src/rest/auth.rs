use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use vidacomdeus_common::validation::{is_valid_email, normalize_email};

use crate::auth::AuthUser;
use crate::db::models::token::{PasswordResetToken, RefreshToken};
use crate::db::models::user::User;
use crate::error::{ApiError, ApiResult};
use crate::jwt::{hash_token, TokenPair, TokenType};
use crate::password::{hash_password_blocking, verify_password_blocking};
use crate::AppState;

use super::ApiJson;

pub const MIN_PASSWORD_CHARS: usize = 6;
const RESET_TOKEN_TTL_HOURS: i64 = 1;
const FORGOT_PASSWORD_MESSAGE: &str =
    "Se o email estiver cadastrado, você receberá as instruções em breve.";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(format!(
            "A senha deve ter pelo menos {MIN_PASSWORD_CHARS} caracteres."
        ));
    }
    Ok(())
}

fn validate_signup(req: &SignupRequest) -> Result<(), String> {
    if req.name.trim().is_empty() {
        return Err("O nome é obrigatório.".to_string());
    }
    if !is_valid_email(&req.email) {
        return Err("Email inválido.".to_string());
    }
    validate_password(&req.password)
}

/// Sign a new pair and persist the refresh token's digest.
async fn issue_pair(state: &AppState, user_id: Uuid) -> ApiResult<TokenPair> {
    let pair = state.jwt.create_pair(user_id)?;
    let expires_at = Utc::now() + state.jwt.refresh_ttl();
    RefreshToken::create(user_id, &hash_token(&pair.refresh_token), expires_at, &state.pool).await?;
    Ok(pair)
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_signup(&req).map_err(ApiError::Validation)?;

    let email = normalize_email(&req.email);
    let hashed = hash_password_blocking(req.password).await?;
    let user = User::create(req.name.trim(), &email, &hashed, &state.pool)
        .await?
        .ok_or_else(|| ApiError::Conflict("Email já cadastrado".to_string()))?;

    info!(user_id = %user.id, "User signed up");
    let pair = issue_pair(&state, user.id).await?;
    Ok((StatusCode::CREATED, Json(pair)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    let invalid = || ApiError::unauthorized("Credenciais inválidas");

    let user = User::find_by_email(&normalize_email(&req.email), &state.pool)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password_blocking(req.password, user.hashed_password.clone()).await? {
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::unauthorized("Conta desativada"));
    }

    Ok(Json(issue_pair(&state, user.id).await?))
}

/// Rotate a refresh token: the presented one is revoked and a new pair issued.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    let invalid = || ApiError::unauthorized("Refresh token inválido");

    state
        .jwt
        .verify_token(&req.refresh_token, TokenType::Refresh)
        .map_err(|_| invalid())?;

    let token_hash = hash_token(&req.refresh_token);
    let Some(user_id) = RefreshToken::consume(&token_hash, &state.pool).await? else {
        let expired = RefreshToken::find_by_hash(&token_hash, &state.pool)
            .await?
            .is_some_and(|t| !t.is_revoked && t.is_expired(Utc::now()));
        return Err(if expired {
            ApiError::unauthorized("Refresh token expirado")
        } else {
            invalid()
        });
    };

    Ok(Json(issue_pair(&state, user_id).await?))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let req: LogoutRequest = if body.iter().all(u8::is_ascii_whitespace) {
        LogoutRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::validation(e.to_string()))?
    };

    if let Some(token) = req.refresh_token.as_deref() {
        RefreshToken::revoke(&hash_token(token), user.user_id, &state.pool).await?;
    }

    info!(user_id = %user.user_id, "User logged out");
    Ok(Json(json!({ "message": "Sessão encerrada com sucesso." })))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let email = normalize_email(&req.email);

    if let Some(user) = User::find_by_email(&email, &state.pool).await? {
        if user.is_active {
            let raw = Uuid::new_v4().to_string();
            let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
            PasswordResetToken::create(user.id, &hash_token(&raw), expires_at, &state.pool).await?;

            if let Err(e) = state.notifier.send_reset(user.id, &user.email, &raw).await {
                warn!(user_id = %user.id, error = %e, "Failed to deliver reset token");
            }
        }
    }

    Ok(Json(json!({ "message": FORGOT_PASSWORD_MESSAGE })))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    validate_password(&req.new_password).map_err(ApiError::Validation)?;

    let invalid = || ApiError::BadRequest("Token de recuperação inválido".to_string());

    let token = PasswordResetToken::find_by_hash(&hash_token(&req.token), &state.pool)
        .await?
        .filter(|t| !t.used)
        .ok_or_else(invalid)?;
    if token.is_expired(Utc::now()) {
        return Err(ApiError::BadRequest("Token de recuperação expirado".to_string()));
    }

    let hashed = hash_password_blocking(req.new_password).await?;
    if !token.redeem(&hashed, &state.pool).await? {
        return Err(invalid());
    }

    info!(user_id = %token.user_id, "Password reset completed");
    Ok(Json(json!({ "message": "Senha redefinida com sucesso." })))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::rest::router;
    use crate::rest::test_support::{body_json, test_state};

    fn signup_request(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn signup_validation() {
        assert!(validate_signup(&signup_request("Ana", "ana@exemplo.com", "123456")).is_ok());
        assert!(validate_signup(&signup_request("  ", "ana@exemplo.com", "123456")).is_err());
        assert!(validate_signup(&signup_request("Ana", "ana@", "123456")).is_err());
        assert!(validate_signup(&signup_request("Ana", "ana@exemplo.com", "12345")).is_err());
    }

    #[test]
    fn password_length_counts_characters() {
        assert!(validate_password("çãéíóú").is_ok());
        assert!(validate_password("çãéíó").is_err());
    }

    #[tokio::test]
    async fn short_reset_password_is_rejected() {
        let (state, _dir) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/auth/reset-password")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"token": Uuid::new_v4().to_string(), "new_password": "123"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["detail"], "A senha deve ter pelo menos 6 caracteres.");
    }

    #[tokio::test]
    async fn refresh_rejects_access_tokens() {
        let (state, _dir) = test_state().await;
        let access = state.jwt.create_access_token(Uuid::new_v4()).unwrap();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/auth/refresh")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "refresh_token": access }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["detail"], "Refresh token inválido");
    }
}
