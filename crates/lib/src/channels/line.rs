//! LINE Messaging API: reply to an event by its reply token.

use crate::config::LineConfig;
use async_trait::async_trait;
use serde::Serialize;

/// LINE rejects text messages longer than this many characters.
pub const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("line channel access token not configured")]
    NotConfigured,
    #[error("reply request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("reply api error: {0}")]
    Api(String),
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), DispatchError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    typ: &'static str,
    text: &'a str,
}

/// Cut `text` to at most `MAX_TEXT_CHARS` characters on a char boundary.
pub fn truncate_for_line(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Reply client for one LINE channel.
pub struct LineClient {
    api_base: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl LineClient {
    pub fn new(line: &LineConfig) -> Self {
        Self {
            api_base: line.api_base.trim_end_matches('/').to_string(),
            access_token: line.channel_access_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// POST /v2/bot/message/reply with a single text message.
    pub async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), DispatchError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(DispatchError::NotConfigured)?;
        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let body = ReplyRequest {
            reply_token,
            messages: vec![TextMessage {
                typ: "text",
                text: truncate_for_line(text),
            }],
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DispatchError::Api(format!("{} {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl ReplySender for LineClient {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), DispatchError> {
        self.reply_text(reply_token, text).await
    }
}
