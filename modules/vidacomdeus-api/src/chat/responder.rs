use async_trait::async_trait;

use ai_client::{AiError, ChatOptions, Message, OpenAi};

use super::FALLBACK_ANSWER;

/// Produces the assistant's answer for a prepared conversation.
#[async_trait]
pub trait ChatResponder: Send + Sync {
    async fn respond(&self, messages: &[Message]) -> Result<String, AiError>;

    fn name(&self) -> &'static str;
}

pub struct OpenAiResponder {
    client: OpenAi,
}

impl OpenAiResponder {
    pub const OPTIONS: ChatOptions = ChatOptions {
        max_tokens: 600,
        temperature: 0.7,
    };

    pub fn new(client: OpenAi) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatResponder for OpenAiResponder {
    async fn respond(&self, messages: &[Message]) -> Result<String, AiError> {
        self.client.chat(messages, Self::OPTIONS).await
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Canned answer used when no LLM is configured.
pub struct FallbackResponder;

#[async_trait]
impl ChatResponder for FallbackResponder {
    async fn respond(&self, _messages: &[Message]) -> Result<String, AiError> {
        Ok(FALLBACK_ANSWER.to_string())
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
