use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::chat::{self, Exchange};
use crate::db::models::chat::{ChatMessage, Conversation, ConversationView, MessageView};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::{parse_id, ApiJson};

const CONVERSATION_NOT_FOUND: &str = "Conversa não encontrada.";

#[derive(Debug, Serialize)]
pub struct ConversationList {
    pub conversations: Vec<ConversationView>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub conversation_id: String,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

async fn owned_conversation(state: &AppState, raw_id: &str, user_id: Uuid) -> ApiResult<Conversation> {
    let id = parse_id(raw_id, CONVERSATION_NOT_FOUND)?;
    Conversation::find_owned(id, user_id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(CONVERSATION_NOT_FOUND))
}

pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let conversation = Conversation::create(user.user_id, &state.pool).await?;
    Ok((StatusCode::CREATED, Json(ConversationView::from(conversation))))
}

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<ConversationList>> {
    let conversations = Conversation::list_for_user(user.user_id, &state.pool)
        .await?
        .into_iter()
        .map(ConversationView::from)
        .collect();
    Ok(Json(ConversationList { conversations }))
}

pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessagesResponse>> {
    let conversation = owned_conversation(&state, &id, user.user_id).await?;
    let messages = ChatMessage::list_with_citations(conversation.id, &state.pool).await?;
    Ok(Json(MessagesResponse {
        conversation_id: conversation.id.to_string(),
        messages,
    }))
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Exchange>)> {
    let content = chat::validate_content(&req.content).map_err(ApiError::Validation)?;
    let conversation = owned_conversation(&state, &id, user.user_id).await?;

    let exchange =
        chat::send_message(conversation.id, content, state.responder.as_ref(), &state.pool).await?;
    Ok((StatusCode::CREATED, Json(exchange)))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::rest::router;
    use crate::rest::test_support::{bearer, body_json, test_state};

    #[tokio::test]
    async fn blank_message_is_unprocessable() {
        let (state, _dir) = test_state().await;
        let auth = bearer(&state);
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/chat/conversations/{}/messages", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "content": "   " }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["detail"], "A mensagem não pode estar vazia.");
    }

    #[tokio::test]
    async fn malformed_conversation_id_is_not_found() {
        let (state, _dir) = test_state().await;
        let auth = bearer(&state);
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/chat/conversations/conv-001/messages")
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["detail"], CONVERSATION_NOT_FOUND);
    }
}
