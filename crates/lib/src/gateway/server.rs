//! Gateway HTTP server: health, LINE webhook, diagnostic page, and a JSON 404.

use crate::channels::{DecodedEvent, LineClient, WebhookEnvelope};
use crate::config::Config;
use crate::content::BundledContent;
use crate::dispatch::{Deadline, Dispatcher};
use crate::llm;
use crate::signature::{self, SIGNATURE_HEADER};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

const SERVICE_NAME: &str = "careline-healthcare-chatbot";
const TEST_PAGE: &str = include_str!("../../static/test.html");
const AVAILABLE_ENDPOINTS: [&str; 3] = ["/health", "/webhook", "/test"];

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, X-Line-Signature, Authorization";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared state for the gateway (immutable config and the event dispatcher).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
}

impl GatewayState {
    pub fn new(config: Arc<Config>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// Wire the production collaborators: bundled content, the configured AI backend, and the LINE reply API.
    pub fn from_config(config: Config) -> Self {
        let generator = llm::build_generator(&config.ai);
        let sender = Arc::new(LineClient::new(&config.line));
        let dispatcher = Dispatcher::new(
            Arc::new(BundledContent::new()),
            generator,
            sender,
            &config.timeouts,
        );
        Self::new(Arc::new(config), Arc::new(dispatcher))
    }
}

/// Per-request correlation id, generated by the middleware and echoed in `X-Request-ID`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Build the router. Every response, including 404s and preflights, carries CORS headers
/// and a fresh request id.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health_http).fallback(not_found))
        .route("/webhook", post(line_webhook).fallback(not_found))
        .route("/test", get(test_page).fallback(not_found))
        .fallback(not_found)
        .layer(middleware::from_fn(cors_and_request_id))
        .with_state(state)
}

/// Serve `state` on an already-bound listener until `shutdown` completes.
pub async fn serve<F>(listener: tokio::net::TcpListener, state: GatewayState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server exited")
}

/// Run the gateway; binds to config.gateway.bind:config.gateway.port and blocks until SIGINT/SIGTERM.
pub async fn run_gateway(config: Config) -> Result<()> {
    if !config.signature_required() {
        log::warn!("line channel secret not configured; webhook signatures will NOT be verified");
    }
    if config.line.channel_access_token.is_none() {
        log::warn!("line channel access token not configured; replies will fail");
    }
    log::info!(
        "ai backend: {} (model {})",
        config.ai.backend.as_str(),
        config.ai.model
    );

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let state = GatewayState::from_config(config);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    serve(listener, state, shutdown_signal()).await?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

fn apply_common_headers(headers: &mut HeaderMap, request_id: &RequestId) {
    headers.insert(
        "access-control-allow-origin",
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    if let Ok(v) = HeaderValue::from_str(&request_id.0) {
        headers.insert(REQUEST_ID_HEADER, v);
    }
}

/// Assigns the request id, answers CORS preflights directly, and decorates every response.
async fn cors_and_request_id(mut req: Request, next: Next) -> Response {
    let request_id = RequestId(uuid::Uuid::new_v4().to_string());
    log::debug!("[{}] {} {}", request_id.0, req.method(), req.uri().path());
    req.extensions_mut().insert(request_id.clone());
    let mut res = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };
    apply_common_headers(res.headers_mut(), &request_id);
    res
}

/// POST /webhook: verifies the LINE signature (when a secret is configured), then
/// dispatches each event in order. Per-event failures never change the 200.
async fn line_webhook(
    State(state): State<GatewayState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let rid = request_id.0.as_str();
    log::info!("[{}] webhook received ({} bytes)", rid, body.len());
    let deadline = Deadline::after(state.config.timeouts.request());

    if state.config.signature_required() {
        let provided = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided.is_empty() || !signature::verify(&body, provided, state.config.line.secret_bytes()) {
            log::warn!("[{}] invalid line signature", rid);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid signature" })),
            )
                .into_response();
        }
    }

    let envelope = match WebhookEnvelope::parse(&body) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("[{}] webhook envelope rejected: {}", rid, e);
            let message = if state.config.environment.is_production() {
                "An error occurred".to_string()
            } else {
                e.to_string()
            };
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Webhook processing failed", "message": message })),
            )
                .into_response();
        }
    };

    for (i, decoded) in envelope.decode_events().into_iter().enumerate() {
        match decoded {
            DecodedEvent::Supported(event) => {
                let kind = event.kind();
                let outcome = state.dispatcher.dispatch(rid, event, deadline).await;
                match outcome.delivery {
                    Ok(()) => log::info!("[{}] event {} ({}) answered from {}", rid, i, kind, outcome.source),
                    Err(e) => log::warn!(
                        "[{}] event {} ({}) answered from {} but not delivered: {}",
                        rid,
                        i,
                        kind,
                        outcome.source,
                        e
                    ),
                }
            }
            DecodedEvent::Unsupported(kind) => {
                log::debug!("[{}] event {} skipped: unsupported type {}", rid, i, kind);
            }
            DecodedEvent::Malformed(reason) => {
                log::warn!("[{}] event {} skipped: {}", rid, i, reason);
            }
        }
    }

    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// GET /health returns service status and configuration summary.
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    let config = &state.config;
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "environment": config.environment.as_str(),
        "runtime": "rust",
        "ai": {
            "provider": config.ai.backend.provider(),
            "model": config.ai.model,
            "max_tokens": config.ai.max_tokens,
            "temperature": config.ai.temperature,
        },
        "features": {
            "healthcare": true,
            "multilingual": true,
            "hiv_information": true,
            "prep_guidance": true,
            "std_information": true,
            "privacy_compliant": true,
            "ai_powered": config.ai.backend != crate::config::AiBackend::Disabled,
        },
        "supported_languages": ["en", "th"],
        "medical_disclaimers": true,
    }))
}

/// GET /test: static diagnostic page.
async fn test_page() -> Html<&'static str> {
    Html(TEST_PAGE)
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found",
            "available_endpoints": AVAILABLE_ENDPOINTS,
        })),
    )
        .into_response()
}
