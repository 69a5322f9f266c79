//! AI fallback: text generation behind one trait, with the backend picked once from config.
//!
//! Supports Cloudflare Workers AI (REST) and a local Ollama instance. Both are
//! non-streaming; callers impose their own timeout.

mod ollama;
mod workers_ai;

use crate::config::{AiBackend, AiConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use ollama::OllamaClient;
pub use workers_ai::WorkersAiClient;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generation api error: {0}")]
    Api(String),
    #[error("generation response malformed: {0}")]
    Malformed(String),
    #[error("generation returned an empty answer")]
    Empty,
    #[error("ai backend disabled")]
    Disabled,
}

/// Produces a free-form answer for a system/user prompt pair.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, GenerationError>;
}

/// One chat turn in the wire format shared by both backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Non-empty trimmed answer, or `GenerationError::Empty`.
fn non_empty_answer(text: &str) -> Result<String, GenerationError> {
    let t = text.trim();
    if t.is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(t.to_string())
    }
}

/// Generator used when `ai.backend` is `disabled`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Disabled)
    }
}

/// Build the generator selected by config.
pub fn build_generator(ai: &AiConfig) -> Arc<dyn TextGenerator> {
    match ai.backend {
        AiBackend::WorkersAi => {
            if ai.account_id.is_none() || ai.api_token.is_none() {
                log::warn!("ai: workersAi selected without accountId/apiToken; generation will fail");
            }
            Arc::new(WorkersAiClient::new(ai))
        }
        AiBackend::Ollama => Arc::new(OllamaClient::new(ai)),
        AiBackend::Disabled => Arc::new(DisabledGenerator),
    }
}
