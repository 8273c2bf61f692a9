use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use vidacomdeus_common::LibraryTab;

use crate::auth::AuthUser;
use crate::db::models::library::{LibraryEntry, LibraryFilter, LibraryItem, Period};
use crate::db::models::post::Post;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::posts::POST_NOT_FOUND;
use super::{non_blank, parse_id, ApiJson};

#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    tab: Option<String>,
    query: Option<String>,
    tag: Option<String>,
    period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub items: Vec<LibraryItem>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub post_id: String,
    pub is_favorited: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub post_id: String,
}

fn parse_query(params: LibraryQuery) -> Result<(LibraryTab, LibraryFilter), String> {
    let tab = match non_blank(params.tab) {
        Some(raw) => raw
            .parse::<LibraryTab>()
            .map_err(|_| format!("Aba inválida: {raw}. Use favorites ou history."))?,
        None => LibraryTab::default(),
    };
    let period = match non_blank(params.period) {
        Some(raw) => raw.parse::<Period>()?,
        None => Period::All,
    };
    Ok((
        tab,
        LibraryFilter {
            query: non_blank(params.query),
            tag: non_blank(params.tag),
            period,
        },
    ))
}

pub async fn get_library(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<LibraryQuery>,
) -> ApiResult<Json<LibraryResponse>> {
    let (tab, filter) = parse_query(params).map_err(ApiError::Validation)?;

    let items: Vec<LibraryItem> = LibraryEntry::list(user.user_id, tab, &filter, &state.pool)
        .await?
        .into_iter()
        .map(LibraryItem::from)
        .collect();

    Ok(Json(LibraryResponse {
        total: items.len(),
        items,
    }))
}

/// Resolve a post id from the path or body, requiring the post to exist.
async fn existing_post(state: &AppState, raw_id: &str) -> ApiResult<uuid::Uuid> {
    let post_id = parse_id(raw_id, POST_NOT_FOUND)?;
    if !Post::exists(post_id, &state.pool).await? {
        return Err(ApiError::not_found(POST_NOT_FOUND));
    }
    Ok(post_id)
}

pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let post_id = existing_post(&state, &post_id).await?;
    LibraryEntry::add_favorite(user.user_id, post_id, &state.pool).await?;

    Ok((
        StatusCode::CREATED,
        Json(FavoriteResponse {
            post_id: post_id.to_string(),
            is_favorited: true,
            message: "Post adicionado aos favoritos.".to_string(),
        }),
    ))
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<Json<FavoriteResponse>> {
    let post_id = parse_id(&post_id, POST_NOT_FOUND)?;
    LibraryEntry::remove_favorite(user.user_id, post_id, &state.pool).await?;

    Ok(Json(FavoriteResponse {
        post_id: post_id.to_string(),
        is_favorited: false,
        message: "Post removido dos favoritos.".to_string(),
    }))
}

pub async fn record_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<HistoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let post_id = existing_post(&state, &req.post_id).await?;
    LibraryEntry::record_reading(user.user_id, post_id, &state.pool).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": format!("Acesso ao post {post_id} registrado.") })),
    ))
}
