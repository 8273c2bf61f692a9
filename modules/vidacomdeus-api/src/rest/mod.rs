pub mod admin;
pub mod auth;
pub mod chat;
pub mod library;
pub mod posts;
pub mod therapist;
pub mod users;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    http::{header, HeaderValue},
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// JSON body extractor whose rejections use the `{"detail": ...}` envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::BadRequest("Content-Type deve ser application/json".to_string())
        }
        other => ApiError::validation(other.body_text()),
    }
}

/// Parse a path id, treating malformed ids like unknown ones.
pub(crate) fn parse_id(raw: &str, not_found: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(not_found))
}

/// Blank query parameters count as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": state.config.app_version }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Auth
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        // Users
        .route("/users/me", get(users::get_me).patch(users::update_me))
        .route(
            "/users/me/settings",
            get(users::get_settings).patch(users::update_settings),
        )
        // Posts
        .route("/posts", get(posts::list_posts))
        .route("/posts/feed", get(posts::feed))
        .route("/posts/{id}", get(posts::get_post))
        .route("/posts/{id}/audio", get(posts::get_audio))
        // Library
        .route("/library", get(library::get_library))
        .route(
            "/library/favorites/{post_id}",
            post(library::add_favorite).delete(library::remove_favorite),
        )
        .route("/library/history", post(library::record_history))
        // Chat
        .route(
            "/chat/conversations",
            get(chat::list_conversations).post(chat::create_conversation),
        )
        .route(
            "/chat/conversations/{id}/messages",
            get(chat::get_messages).post(chat::send_message),
        )
        // Therapist
        .route("/therapist/overview", get(therapist::overview))
        .route(
            "/therapist/patients",
            get(therapist::list_patients).post(therapist::create_patient),
        )
        .route(
            "/therapist/patients/{id}",
            get(therapist::get_patient).patch(therapist::update_patient),
        )
        .route("/therapist/patients/{id}/status", patch(therapist::update_status))
        .route("/therapist/patients/{id}/limit", patch(therapist::update_limit))
        .route(
            "/therapist/patients/{id}/sessions",
            get(therapist::list_sessions).post(therapist::create_session),
        )
        .route(
            "/therapist/patients/{id}/sessions/{session_id}",
            patch(therapist::update_session),
        )
        // Admin
        .route("/admin/metrics/storage", get(admin::storage_metrics))
        .route("/admin/metrics/growth", get(admin::growth_metrics))
        .route("/admin/etl/runs", get(admin::etl_runs))
        .route("/admin/etl/runs/execute", post(admin::execute_etl))
        .route("/admin/alerts", get(admin::alerts))
}

/// The full HTTP application.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .nest("/v1", v1_routes())
        .with_state(state)
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Method and path only: query strings may carry search terms.
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}


#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::test_support::{bearer, body_json, test_state};
    use super::*;

    #[tokio::test]
    async fn health_reports_version() {
        let (state, _dir) = test_state().await;
        let version = state.config.app_version.clone();
        let app = router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], version);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let (state, _dir) = test_state().await;
        let app = router(state);

        for uri in ["/v1/users/me", "/v1/library", "/v1/therapist/patients", "/v1/admin/alerts"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

            let body: serde_json::Value = body_json(response.into_body()).await;
            assert_eq!(body["detail"], "Token de autenticação necessário");
        }
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let (state, _dir) = test_state().await;
        let refresh = state.jwt.create_refresh_token(Uuid::new_v4()).unwrap();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/therapist/overview")
                    .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["detail"], "Token inválido ou expirado");
    }

    #[tokio::test]
    async fn invalid_token_on_public_route_is_rejected() {
        let (state, _dir) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/posts/feed")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_post_id_is_not_found() {
        let (state, _dir) = test_state().await;
        let app = router(state);

        for uri in ["/v1/posts/not-a-uuid", "/v1/posts/42/audio"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            let body: serde_json::Value = body_json(response.into_body()).await;
            assert_eq!(body["detail"], "Post não encontrado.");
        }
    }

    #[tokio::test]
    async fn signup_validation_runs_before_the_database() {
        let (state, _dir) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/auth/signup")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"name": "Ana", "email": "ana-sem-arroba", "password": "123456"})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn malformed_json_uses_detail_envelope() {
        let (state, _dir) = test_state().await;
        let auth = bearer(&state);
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/therapist/patients")
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"name\": "))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let (state, _dir) = test_state().await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/v1/posts")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
    }
}
