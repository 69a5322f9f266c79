//! Shared helpers: start the gateway on a free port with recording fakes.

#![allow(dead_code)]

use async_trait::async_trait;
use lib::channels::{DispatchError, ReplySender};
use lib::config::Config;
use lib::content::BundledContent;
use lib::dispatch::Dispatcher;
use lib::gateway::{self, GatewayState};
use lib::llm::{GenerationError, TextGenerator};
use std::sync::{Arc, Mutex};

/// Records every reply attempt; optionally fails each one.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingSender {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn replies(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), DispatchError> {
        self.sent
            .lock()
            .unwrap()
            .push((reply_token.to_string(), text.to_string()));
        if self.fail {
            Err(DispatchError::Api("503 unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Generator that always fails.
pub struct BrokenGenerator;

#[async_trait]
impl TextGenerator for BrokenGenerator {
    fn name(&self) -> &str {
        "broken"
    }

    async fn generate(&self, _system: &str, _user: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Api("500 internal".to_string()))
    }
}

/// Generator that answers with a fixed string.
pub struct FixedGenerator(pub &'static str);

#[async_trait]
impl TextGenerator for FixedGenerator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, _system: &str, _user: &str) -> Result<String, GenerationError> {
        Ok(self.0.to_string())
    }
}

pub struct TestGateway {
    pub base_url: String,
    pub sender: Arc<RecordingSender>,
    pub client: reqwest::Client,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Bind 127.0.0.1:0 and serve until the test runtime shuts down.
pub async fn start(
    config: Config,
    generator: Arc<dyn TextGenerator>,
    sender: Arc<RecordingSender>,
) -> TestGateway {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local_addr");
    let dispatcher = Dispatcher::new(
        Arc::new(BundledContent::new()),
        generator,
        sender.clone(),
        &config.timeouts,
    );
    let state = GatewayState::new(Arc::new(config), Arc::new(dispatcher));
    tokio::spawn(async move {
        let _ = gateway::serve(listener, state, std::future::pending()).await;
    });
    TestGateway {
        base_url: format!("http://{}", addr),
        sender,
        client: reqwest::Client::new(),
    }
}

pub fn text_event(reply_token: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "replyToken": reply_token,
        "source": { "type": "user", "userId": "U-test" },
        "message": { "id": "1", "type": "text", "text": text }
    })
}

pub fn envelope(events: Vec<serde_json::Value>) -> String {
    serde_json::json!({ "destination": "U-bot", "events": events }).to_string()
}
