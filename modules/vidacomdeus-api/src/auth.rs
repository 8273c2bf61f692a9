use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::jwt::{JwtService, TokenType};
use crate::AppState;

const MISSING_TOKEN: &str = "Token de autenticação necessário";
const INVALID_TOKEN: &str = "Token inválido ou expirado";

/// Authenticated user. Extract this in handlers that require a bearer access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Optional authentication for public routes. A token that is present must still be valid.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Uuid>);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?
            .ok_or_else(|| ApiError::unauthorized(MISSING_TOKEN))?;
        let user_id = authenticate(&state.jwt, token)?;
        Ok(AuthUser { user_id })
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers)? {
            Some(token) => Ok(MaybeAuthUser(Some(authenticate(&state.jwt, token)?))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}

/// The bearer credential of the `Authorization` header, if any.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::unauthorized(INVALID_TOKEN))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| ApiError::unauthorized(INVALID_TOKEN))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ApiError::unauthorized(INVALID_TOKEN));
    }
    Ok(Some(token.trim()))
}

fn authenticate(jwt: &JwtService, token: &str) -> Result<Uuid, ApiError> {
    let claims = jwt
        .verify_token(token, TokenType::Access)
        .map_err(|_| ApiError::unauthorized(INVALID_TOKEN))?;
    Uuid::parse_str(&claims.sub).map_err(|_| ApiError::unauthorized(INVALID_TOKEN))
}
