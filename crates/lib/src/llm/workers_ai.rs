//! Cloudflare Workers AI client (REST).
//!
//! `POST {base}/client/v4/accounts/{account}/ai/run/{model}` with a bearer token. The
//! response envelope is `{ "success": bool, "result": { "response": "..." }, "errors": [...] }`.

use crate::config::AiConfig;
use crate::llm::{non_empty_answer, ChatMessage, GenerationError, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com";

#[derive(Clone)]
pub struct WorkersAiClient {
    base_url: String,
    account_id: Option<String>,
    api_token: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl WorkersAiClient {
    pub fn new(ai: &AiConfig) -> Self {
        let base_url = ai
            .base_url
            .as_ref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            account_id: ai.account_id.clone(),
            api_token: ai.api_token.clone(),
            model: ai.model.clone(),
            max_tokens: ai.max_tokens,
            temperature: ai.temperature,
            client: reqwest::Client::new(),
        }
    }

    fn run_url(&self, account_id: &str) -> String {
        format!(
            "{}/client/v4/accounts/{}/ai/run/{}",
            self.base_url, account_id, self.model
        )
    }

    /// Run the configured model on a message list and return the raw envelope.
    pub async fn run(&self, messages: Vec<ChatMessage>) -> Result<RunResponse, GenerationError> {
        let account_id = self
            .account_id
            .as_deref()
            .ok_or_else(|| GenerationError::Api("cloudflare account id not configured".to_string()))?;
        let token = self
            .api_token
            .as_deref()
            .ok_or_else(|| GenerationError::Api("cloudflare api token not configured".to_string()))?;
        let body = RunRequest {
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let res = self
            .client
            .post(self.run_url(account_id))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Api(format!("{} {}", status, body)));
        }
        let data: RunResponse = res.json().await?;
        Ok(data)
    }
}

#[async_trait]
impl TextGenerator for WorkersAiClient {
    fn name(&self) -> &str {
        "workersAi"
    }

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, GenerationError> {
        let res = self
            .run(vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)])
            .await?;
        let text = res.into_text()?;
        non_empty_answer(&text)
    }
}

#[derive(Debug, Serialize)]
struct RunRequest {
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<RunResult>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub response: Option<String>,
}

impl RunResponse {
    /// Generated text, or an error when the envelope reports failure or has no text.
    pub fn into_text(self) -> Result<String, GenerationError> {
        if !self.success {
            let detail = serde_json::to_string(&self.errors).unwrap_or_default();
            return Err(GenerationError::Api(format!("success=false {}", detail)));
        }
        self.result
            .and_then(|r| r.response)
            .ok_or_else(|| GenerationError::Malformed("missing result.response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_url_includes_account_and_model() {
        let ai = AiConfig {
            account_id: Some("acc".to_string()),
            api_token: Some("tok".to_string()),
            ..AiConfig::default()
        };
        let c = WorkersAiClient::new(&ai);
        assert_eq!(
            c.run_url("acc"),
            "https://api.cloudflare.com/client/v4/accounts/acc/ai/run/@cf/meta/llama-3-8b-instruct"
        );
    }

    #[test]
    fn successful_envelope_yields_text() {
        let r: RunResponse =
            serde_json::from_str(r#"{"success":true,"result":{"response":"hi"},"errors":[]}"#).unwrap();
        assert_eq!(r.into_text().unwrap(), "hi");
    }

    #[test]
    fn failed_envelope_is_api_error() {
        let r: RunResponse =
            serde_json::from_str(r#"{"success":false,"errors":[{"code":7000}]}"#).unwrap();
        assert!(matches!(r.into_text(), Err(GenerationError::Api(_))));
    }

    #[test]
    fn missing_response_is_malformed() {
        let r: RunResponse = serde_json::from_str(r#"{"success":true,"result":{}}"#).unwrap();
        assert!(matches!(r.into_text(), Err(GenerationError::Malformed(_))));
    }

    #[tokio::test]
    async fn missing_credentials_fail_without_network() {
        let c = WorkersAiClient::new(&AiConfig::default());
        let err = c.generate("s", "u").await.unwrap_err();
        assert!(matches!(err, GenerationError::Api(_)));
    }
}
