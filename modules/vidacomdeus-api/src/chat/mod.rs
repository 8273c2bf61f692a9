//! Biblical chat: prompt assembly, the responder seam and citation extraction.

pub mod citations;
pub mod responder;

use anyhow::Result;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use ai_client::Message;
use vidacomdeus_common::ChatRole;

use crate::db::models::chat::{ChatMessage, MessageView};

pub use citations::extract_citations;
pub use responder::{ChatResponder, FallbackResponder, OpenAiResponder};

pub const SYSTEM_PROMPT: &str = "Você é um especialista em Bíblia Sagrada com profundo conhecimento das escrituras cristãs.
Responda sempre em Português do Brasil de forma pastoral, respeitosa e edificante.
Ao citar versículos, indique o livro, capítulo e versículo (ex.: \"João 3:16\").
Baseie suas respostas exclusivamente nas escrituras bíblicas.
Seja conciso, claro e espiritualmente enriquecedor.";

pub const FALLBACK_ANSWER: &str = "Com base na sua pergunta, posso compartilhar que a Bíblia oferece \
sabedoria profunda sobre este tema. Provérbios 3:5-6 nos instrui a confiar no Senhor de todo o \
coração e não nos apoiar no nosso próprio entendimento.";

pub const MAX_MESSAGE_CHARS: usize = 4000;
/// Prior messages sent along with a new question.
pub const CONTEXT_MESSAGES: i64 = 10;

/// Trimmed message content, or the reason it is rejected.
pub fn validate_content(content: &str) -> Result<&str, String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err("A mensagem não pode estar vazia.".to_string());
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(format!(
            "A mensagem deve ter no máximo {MAX_MESSAGE_CHARS} caracteres."
        ));
    }
    Ok(trimmed)
}

/// System prompt, prior turns in order, then the new question.
pub fn build_prompt(history: &[ChatMessage], question: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(SYSTEM_PROMPT));
    for prior in history {
        match prior.role() {
            Ok(ChatRole::User) => messages.push(Message::user(prior.content.clone())),
            Ok(ChatRole::Assistant) => messages.push(Message::assistant(prior.content.clone())),
            Err(e) => warn!(error = %e, "Skipping message with unknown role"),
        }
    }
    messages.push(Message::user(question));
    messages
}

/// Ask the responder, falling back to the canned answer when the call fails.
pub async fn answer(responder: &dyn ChatResponder, messages: &[Message]) -> String {
    match responder.respond(messages).await {
        Ok(content) => content,
        Err(e) => {
            warn!(responder = responder.name(), error = %e, "Chat responder failed, using fallback answer");
            FALLBACK_ANSWER.to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub user_message: MessageView,
    pub assistant_message: MessageView,
}

/// Persist the question, obtain an answer with its citations and persist it too.
pub async fn send_message(
    conversation_id: Uuid,
    content: &str,
    responder: &dyn ChatResponder,
    pool: &PgPool,
) -> Result<Exchange> {
    let history = ChatMessage::recent(conversation_id, CONTEXT_MESSAGES, pool).await?;
    let user_message =
        ChatMessage::append(conversation_id, ChatRole::User, content, &[], pool).await?;

    let prompt = build_prompt(&history, content);
    let reply = answer(responder, &prompt).await;
    let citations = extract_citations(&reply);

    let assistant_message =
        ChatMessage::append(conversation_id, ChatRole::Assistant, &reply, &citations, pool).await?;

    info!(
        conversation_id = %conversation_id,
        responder = responder.name(),
        citations = citations.len(),
        "Chat message answered"
    );

    Ok(Exchange {
        user_message,
        assistant_message,
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;

    use ai_client::{AiError, MessageRole};

    use super::*;

    struct Failing;

    #[async_trait]
    impl ChatResponder for Failing {
        async fn respond(&self, _messages: &[Message]) -> Result<String, AiError> {
            Err(AiError::Network("connection refused".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn stored(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            role: role.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn content_validation() {
        assert_eq!(validate_content("  Quem foi Davi?  "), Ok("Quem foi Davi?"));
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"a".repeat(4000)).is_ok());
        assert!(validate_content(&"a".repeat(4001)).is_err());
    }

    #[test]
    fn prompt_includes_history() {
        let history = vec![
            stored("user", "O que é fé?"),
            stored("assistant", "Hebreus 11:1 define a fé."),
        ];
        let prompt = build_prompt(&history, "E a esperança?");
        let roles: Vec<MessageRole> = prompt.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
        assert_eq!(prompt[0].content, SYSTEM_PROMPT);
        assert_eq!(prompt[3].content, "E a esperança?");
    }

    #[tokio::test]
    async fn failed_responder_falls_back() {
        let reply = answer(&Failing, &[Message::user("Oi")]).await;
        assert_eq!(reply, FALLBACK_ANSWER);
    }
}
