//! Event dispatcher: one inbound event in, exactly one reply attempt out.
//!
//! A text message moves through detect → classify → resolve → compose → deliver.
//! Resolution either yields a raw answer (knowledge base for specific topics, the AI
//! generator for General) or fails into the fallback state, where the fixed apology is
//! composed with General framing. Delivery failures are logged and never retried.

use crate::channels::{DispatchError, InboundEvent, ReplySender};
use crate::compose::{compose, fallback_reply};
use crate::config::TimeoutConfig;
use crate::content::{self, ContentStore};
use crate::intent::{self, Topic};
use crate::language::{self, Language};
use crate::llm::{GenerationError, TextGenerator};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const LOG_PREVIEW_CHARS: usize = 100;

/// Shortest window a reply send ever gets, even when the request deadline has passed.
/// Keeps a late event from being dropped without a send attempt.
const MIN_DELIVERY_WINDOW: Duration = Duration::from_secs(1);

/// Point in time by which a whole webhook request must be finished.
/// Per-call timeouts are clipped to whatever is left of it.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// The smaller of `limit` and the time left.
    pub fn clip(&self, limit: Duration) -> Duration {
        limit.min(self.remaining())
    }

    /// Like `clip`, but keeps `reserve` of the time left for a later step.
    pub fn clip_reserving(&self, limit: Duration, reserve: Duration) -> Duration {
        limit.min(self.remaining().saturating_sub(reserve))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no content for {topic}/{language}")]
    ContentMissing { topic: Topic, language: Language },
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("ai generation timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("reply timed out after {0:?}")]
    Timeout(Duration),
}

/// Where the reply text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Welcome,
    Knowledge(Topic),
    Generated,
    Fallback,
}

impl fmt::Display for ReplySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplySource::Welcome => f.write_str("welcome"),
            ReplySource::Knowledge(t) => write!(f, "knowledge:{}", t),
            ReplySource::Generated => f.write_str("generated"),
            ReplySource::Fallback => f.write_str("fallback"),
        }
    }
}

/// Final outbound text for one event.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
    pub topic: Topic,
    pub language: Language,
}

/// What happened to one event.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub source: ReplySource,
    pub delivery: Result<(), DeliveryError>,
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if text.chars().count() > LOG_PREVIEW_CHARS {
        out.push('…');
    }
    out
}

/// Per-event orchestrator. Holds only shared, read-only collaborators, so one instance
/// serves every request concurrently.
pub struct Dispatcher {
    content: Arc<dyn ContentStore>,
    generator: Arc<dyn TextGenerator>,
    sender: Arc<dyn ReplySender>,
    generation_timeout: Duration,
    dispatch_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        content: Arc<dyn ContentStore>,
        generator: Arc<dyn TextGenerator>,
        sender: Arc<dyn ReplySender>,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            content,
            generator,
            sender,
            generation_timeout: timeouts.generation(),
            dispatch_timeout: timeouts.dispatch(),
        }
    }

    /// Answer one event and attempt exactly one reply. Never fails; the outcome reports
    /// where the text came from and whether delivery succeeded. `rid` tags every log line.
    pub async fn dispatch(&self, rid: &str, event: InboundEvent, deadline: Deadline) -> DispatchOutcome {
        match event {
            InboundEvent::Follow { reply_token } => {
                log::info!("[{}] dispatch: follow event, sending welcome", rid);
                let delivery = self
                    .deliver(rid, &reply_token, content::welcome_message(), deadline)
                    .await;
                DispatchOutcome {
                    source: ReplySource::Welcome,
                    delivery,
                }
            }
            InboundEvent::Message {
                text,
                sender_id,
                reply_token,
            } => {
                log::debug!("[{}] dispatch: message from {}: {}", rid, sender_id, preview(&text));
                let reply = self.answer(rid, &text, deadline).await;
                let delivery = self.deliver(rid, &reply_token, &reply.text, deadline).await;
                DispatchOutcome {
                    source: reply.source,
                    delivery,
                }
            }
        }
    }

    /// Classify `text` and build the composed reply, substituting the fallback on any failure.
    pub async fn answer(&self, rid: &str, text: &str, deadline: Deadline) -> Reply {
        let language = language::detect(text);
        let topic = intent::classify(text);
        log::info!("[{}] dispatch: intent={} language={}", rid, topic, language);

        match self.resolve(rid, text, topic, language, deadline).await {
            Ok((raw, source)) => Reply {
                text: compose(&raw, topic, language),
                source,
                topic,
                language,
            },
            Err(e) => {
                log::warn!(
                    "[{}] dispatch: resolving {} answer failed, using fallback: {}",
                    rid,
                    topic,
                    e
                );
                Reply {
                    text: compose(fallback_reply(language), Topic::General, language),
                    source: ReplySource::Fallback,
                    topic,
                    language,
                }
            }
        }
    }

    async fn resolve(
        &self,
        rid: &str,
        text: &str,
        topic: Topic,
        language: Language,
        deadline: Deadline,
    ) -> Result<(String, ReplySource), ResolveError> {
        if topic.is_specific() {
            return self
                .content
                .lookup(topic, language)
                .map(|raw| (raw, ReplySource::Knowledge(topic)))
                .ok_or(ResolveError::ContentMissing { topic, language });
        }

        let limit = deadline.clip_reserving(self.generation_timeout, self.dispatch_timeout);
        let system_prompt = content::system_prompt(language);
        let user_prompt = content::user_prompt(text, topic, language);
        log::debug!(
            "[{}] dispatch: asking {} (limit {:?})",
            rid,
            self.generator.name(),
            limit
        );
        match tokio::time::timeout(limit, self.generator.generate(system_prompt, &user_prompt)).await {
            Ok(Ok(raw)) => Ok((raw, ReplySource::Generated)),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ResolveError::Timeout(limit)),
        }
    }

    async fn deliver(
        &self,
        rid: &str,
        reply_token: &str,
        text: &str,
        deadline: Deadline,
    ) -> Result<(), DeliveryError> {
        let limit = deadline
            .clip(self.dispatch_timeout)
            .max(MIN_DELIVERY_WINDOW.min(self.dispatch_timeout));
        let result = match tokio::time::timeout(limit, self.sender.send_reply(reply_token, text)).await {
            Ok(r) => r.map_err(DeliveryError::from),
            Err(_) => Err(DeliveryError::Timeout(limit)),
        };
        match &result {
            Ok(()) => log::info!("[{}] dispatch: reply sent ({} chars)", rid, text.chars().count()),
            Err(e) => log::warn!("[{}] dispatch: reply not delivered: {}", rid, e),
        }
        result
    }
}
