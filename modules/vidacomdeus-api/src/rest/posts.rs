use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::MaybeAuthUser;
use crate::db::models::post::{Post, PostAudio, PostDetail, PostSummary};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::{non_blank, parse_id};

pub(crate) const POST_NOT_FOUND: &str = "Post não encontrado.";

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    query: Option<String>,
    tag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub post_of_day: PostSummary,
    pub recent_posts: Vec<PostSummary>,
}

pub async fn feed(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
) -> ApiResult<Json<FeedResponse>> {
    let now = Utc::now();
    let mut posts = Post::feed(viewer, &state.pool)
        .await?
        .into_iter()
        .map(|p| p.summary(now));

    let post_of_day = posts
        .next()
        .ok_or_else(|| ApiError::not_found("Nenhum post disponível no feed."))?;

    Ok(Json(FeedResponse {
        post_of_day,
        recent_posts: posts.collect(),
    }))
}

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(params): Query<PostsQuery>,
) -> ApiResult<Json<Vec<PostSummary>>> {
    let query = non_blank(params.query);
    let tag = non_blank(params.tag);

    let now = Utc::now();
    let posts = Post::list(query.as_deref(), tag.as_deref(), viewer, None, &state.pool)
        .await?
        .iter()
        .map(|p| p.summary(now))
        .collect();
    Ok(Json(posts))
}

async fn load(state: &AppState, raw_id: &str, viewer: Option<uuid::Uuid>) -> ApiResult<Post> {
    let id = parse_id(raw_id, POST_NOT_FOUND)?;
    Post::find_by_id(id, viewer, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(POST_NOT_FOUND))
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PostDetail>> {
    Ok(Json(load(&state, &id, viewer).await?.into_detail()))
}

pub async fn get_audio(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PostAudio>> {
    Ok(Json(load(&state, &id, viewer).await?.into_audio()))
}
