mod client;
pub(crate) mod types;

use std::time::Duration;

use client::{OpenAiClient, OPENAI_API_URL};

use crate::error::{AiError, Result};
use crate::traits::Message;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sampling options for a single chat completion.
#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

// =============================================================================
// OpenAi
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a chat completion and return the first choice's text.
    pub async fn chat(&self, messages: &[Message], options: ChatOptions) -> Result<String> {
        let wire = messages.iter().map(types::WireMessage::from);
        let mut request = types::ChatRequest::new(&self.model).messages(wire);

        if types::uses_max_completion_tokens(&self.model) {
            request = request.max_completion_tokens(options.max_tokens);
        } else {
            request = request
                .max_tokens(options.max_tokens)
                .temperature(options.temperature);
        }

        let client = OpenAiClient::new(&self.api_key, &self.base_url, self.timeout)?;
        let response = client.chat(&request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AiError::Parse("No response content from OpenAI".to_string()))
    }
}

impl std::fmt::Debug for OpenAi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAi")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
