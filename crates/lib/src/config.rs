//! Configuration types and loading.
//!
//! Config is loaded once from a JSON file (e.g. `~/.careline/config.json`) and the
//! environment. Environment overrides are folded in at load time; after that the
//! config is immutable and handed to components behind an `Arc`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Deployment environment; controls error detail in HTTP responses.
    #[serde(default)]
    pub environment: Environment,

    /// LINE channel credentials.
    #[serde(default)]
    pub line: LineConfig,

    /// AI fallback backend and generation parameters.
    #[serde(default)]
    pub ai: AiConfig,

    /// Upper bounds for upstream calls.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Bind address and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8787).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8787
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Generic error messages only.
    #[default]
    Production,
    /// Error responses include the underlying message.
    Development,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Environment::Production),
            "development" | "dev" => Some(Environment::Development),
            _ => None,
        }
    }
}

const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";

/// LINE Messaging API channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineConfig {
    /// Channel secret used to verify `x-line-signature`. Unset means signature checks are skipped.
    pub channel_secret: Option<String>,
    /// Long-lived channel access token for the reply API. Unset means replies fail with NotConfigured.
    pub channel_access_token: Option<String>,
    /// Messaging API base URL (tests point this at a local server).
    #[serde(default = "default_line_api_base")]
    pub api_base: String,
}

fn default_line_api_base() -> String {
    DEFAULT_LINE_API_BASE.to_string()
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: None,
            channel_access_token: None,
            api_base: default_line_api_base(),
        }
    }
}

impl LineConfig {
    /// Secret bytes for signature verification; empty when unset.
    pub fn secret_bytes(&self) -> &[u8] {
        self.channel_secret.as_deref().map(str::as_bytes).unwrap_or(&[])
    }
}

/// Which generation backend answers General messages. Chosen once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AiBackend {
    /// Cloudflare Workers AI REST API.
    #[default]
    WorkersAi,
    /// Local Ollama runtime (`/api/chat`).
    Ollama,
    /// No generation; General messages receive the fallback reply.
    Disabled,
}

impl AiBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            AiBackend::WorkersAi => "workersAi",
            AiBackend::Ollama => "ollama",
            AiBackend::Disabled => "disabled",
        }
    }

    /// Provider label reported by /health.
    pub fn provider(self) -> &'static str {
        match self {
            AiBackend::WorkersAi => "cloudflare-workers-ai",
            AiBackend::Ollama => "ollama",
            AiBackend::Disabled => "none",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "workersai" | "workers-ai" | "cloudflare" => Some(AiBackend::WorkersAi),
            "ollama" => Some(AiBackend::Ollama),
            "disabled" | "none" | "off" => Some(AiBackend::Disabled),
            _ => None,
        }
    }
}

/// AI fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    #[serde(default)]
    pub backend: AiBackend,
    /// Model id, e.g. "@cf/meta/llama-3-8b-instruct" or "llama3.2:latest".
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Cloudflare account id (workersAi only).
    pub account_id: Option<String>,
    /// Cloudflare API token (workersAi only).
    pub api_token: Option<String>,
    /// Override the backend base URL. Defaults: Cloudflare API or http://127.0.0.1:11434.
    pub base_url: Option<String>,
}

fn default_ai_model() -> String {
    "@cf/meta/llama-3-8b-instruct".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: AiBackend::default(),
            model: default_ai_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            account_id: None,
            api_token: None,
            base_url: None,
        }
    }
}

/// Timeouts in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutConfig {
    /// Budget for one webhook request; per-call limits are clipped to what remains of it.
    #[serde(default = "default_request_ms")]
    pub request_ms: u64,
    /// AI generation call.
    #[serde(default = "default_generation_ms")]
    pub generation_ms: u64,
    /// Outbound reply call.
    #[serde(default = "default_dispatch_ms")]
    pub dispatch_ms: u64,
}

fn default_request_ms() -> u64 {
    25_000
}

fn default_generation_ms() -> u64 {
    15_000
}

fn default_dispatch_ms() -> u64 {
    5_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: default_request_ms(),
            generation_ms: default_generation_ms(),
            dispatch_ms: default_dispatch_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn generation(&self) -> Duration {
        Duration::from_millis(self.generation_ms)
    }

    pub fn dispatch(&self) -> Duration {
        Duration::from_millis(self.dispatch_ms)
    }
}

/// Trimmed, non-empty value or None.
fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Key material: dropped when blank, otherwise kept byte for byte.
fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Fold environment overrides into the config. `lookup` is `std::env::var` in production
    /// and a map in tests. Blank values are ignored; unparsable numbers or enums are errors.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = non_blank(lookup("CHANNEL_SECRET")) {
            self.line.channel_secret = Some(v);
        }
        if let Some(v) = non_blank(lookup("CHANNEL_ACCESS_TOKEN")) {
            self.line.channel_access_token = Some(v);
        }
        if let Some(v) = non_empty(lookup("CLOUDFLARE_ACCOUNT_ID")) {
            self.ai.account_id = Some(v);
        }
        if let Some(v) = non_empty(lookup("CLOUDFLARE_API_TOKEN")) {
            self.ai.api_token = Some(v);
        }
        if let Some(v) = non_empty(lookup("AI_MODEL")) {
            self.ai.model = v;
        }
        if let Some(v) = non_empty(lookup("AI_MAX_TOKENS")) {
            self.ai.max_tokens = v
                .parse()
                .with_context(|| format!("parsing AI_MAX_TOKENS={:?}", v))?;
        }
        if let Some(v) = non_empty(lookup("AI_TEMPERATURE")) {
            self.ai.temperature = v
                .parse()
                .with_context(|| format!("parsing AI_TEMPERATURE={:?}", v))?;
        }
        if let Some(v) = non_empty(lookup("AI_BACKEND")) {
            self.ai.backend = AiBackend::parse(&v)
                .with_context(|| format!("unknown AI_BACKEND {:?}", v))?;
        }
        if let Some(v) = non_empty(lookup("ENVIRONMENT")) {
            self.environment = Environment::parse(&v)
                .with_context(|| format!("unknown ENVIRONMENT {:?}", v))?;
        }
        self.line.channel_secret = non_blank(self.line.channel_secret.take());
        self.line.channel_access_token = non_blank(self.line.channel_access_token.take());
        Ok(self)
    }

    /// True when webhook signatures are checked.
    pub fn signature_required(&self) -> bool {
        self.line.channel_secret.is_some()
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("CARELINE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".careline").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Environment overrides are applied before returning.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    let config = config.apply_env(|k| std::env::var(k).ok())?;
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.gateway.port, 8787);
        assert_eq!(c.gateway.bind, "127.0.0.1");
        assert_eq!(c.environment, Environment::Production);
        assert_eq!(c.ai.backend, AiBackend::WorkersAi);
        assert_eq!(c.ai.model, "@cf/meta/llama-3-8b-instruct");
        assert_eq!(c.ai.max_tokens, 2000);
        assert_eq!(c.line.api_base, "https://api.line.me");
        assert!(!c.signature_required());
    }

    #[test]
    fn parses_camel_case_json() {
        let json = r#"{
            "environment": "development",
            "line": { "channelSecret": "s", "channelAccessToken": "t" },
            "ai": { "backend": "ollama", "model": "llama3.2:latest" },
            "timeouts": { "generationMs": 100 }
        }"#;
        let c: Config = serde_json::from_str(json).unwrap();
        assert_eq!(c.environment, Environment::Development);
        assert_eq!(c.line.channel_secret.as_deref(), Some("s"));
        assert_eq!(c.ai.backend, AiBackend::Ollama);
        assert_eq!(c.timeouts.generation_ms, 100);
        assert_eq!(c.timeouts.dispatch_ms, 5_000);
    }

    #[test]
    fn env_overrides_config() {
        let c = Config::default()
            .apply_env(env(&[
                ("CHANNEL_SECRET", "secret"),
                ("CHANNEL_ACCESS_TOKEN", "token"),
                ("AI_MAX_TOKENS", "512"),
                ("AI_TEMPERATURE", "0.2"),
                ("AI_BACKEND", "disabled"),
                ("ENVIRONMENT", "development"),
            ]))
            .unwrap();
        assert_eq!(c.line.channel_secret.as_deref(), Some("secret"));
        assert_eq!(c.line.channel_access_token.as_deref(), Some("token"));
        assert_eq!(c.ai.max_tokens, 512);
        assert!((c.ai.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(c.ai.backend, AiBackend::Disabled);
        assert_eq!(c.environment, Environment::Development);
        assert!(c.signature_required());
    }

    #[test]
    fn blank_env_is_ignored_and_blank_secret_means_open_mode() {
        let mut c = Config::default();
        c.line.channel_secret = Some("   ".to_string());
        let c = c.apply_env(env(&[("CHANNEL_SECRET", "  "), ("AI_MODEL", "")])).unwrap();
        assert!(c.line.channel_secret.is_none());
        assert!(!c.signature_required());
        assert_eq!(c.ai.model, "@cf/meta/llama-3-8b-instruct");
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(Config::default()
            .apply_env(env(&[("AI_MAX_TOKENS", "lots")]))
            .is_err());
        assert!(Config::default()
            .apply_env(env(&[("AI_BACKEND", "gpt")]))
            .is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("careline-missing-{}.json", uuid::Uuid::new_v4()));
        let (c, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(c.gateway.port, 8787);
    }

    #[test]
    fn key_material_is_not_trimmed() {
        let mut c = Config::default();
        c.line.channel_access_token = Some(" token\t".to_string());
        let c = c.apply_env(env(&[("CHANNEL_SECRET", " s3cret ")])).unwrap();
        assert_eq!(c.line.channel_secret.as_deref(), Some(" s3cret "));
        assert_eq!(c.line.channel_access_token.as_deref(), Some(" token\t"));
        assert_eq!(c.line.secret_bytes(), b" s3cret ");
    }
}
