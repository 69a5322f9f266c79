//! Ollama API client (http://127.0.0.1:11434 by default).
//! Non-streaming chat only.

use crate::config::AiConfig;
use crate::llm::{non_empty_answer, ChatMessage, GenerationError, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Client for Ollama HTTP API.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    options: ChatOptions,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(ai: &AiConfig) -> Self {
        let base_url = ai
            .base_url
            .as_ref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            model: ai.model.clone(),
            options: ChatOptions {
                temperature: ai.temperature,
                num_predict: ai.max_tokens,
            },
            client: reqwest::Client::new(),
        }
    }

    /// POST /api/chat, non-streaming chat completion.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse, GenerationError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            options: self.options.clone(),
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Api(format!("{} {}", status, body)));
        }
        let data: ChatResponse = res.json().await?;
        Ok(data)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, GenerationError> {
        let res = self
            .chat(vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)])
            .await?;
        non_empty_answer(res.content())
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub done: bool,
}

impl ChatResponse {
    /// Text content of the assistant message, if any.
    pub fn content(&self) -> &str {
        self.message
            .as_ref()
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}
