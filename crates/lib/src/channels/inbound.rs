//! Inbound events decoded from a LINE webhook envelope.
//!
//! Events are decoded one at a time so a single malformed or unsupported event is
//! skipped without affecting the rest of the envelope.

use serde::Deserialize;

/// A webhook event the dispatcher knows how to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A user sent a text message.
    Message {
        text: String,
        sender_id: String,
        reply_token: String,
    },
    /// A user added the bot as a friend (or unblocked it).
    Follow { reply_token: String },
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Message { .. } => "message",
            InboundEvent::Follow { .. } => "follow",
        }
    }

    pub fn reply_token(&self) -> &str {
        match self {
            InboundEvent::Message { reply_token, .. } | InboundEvent::Follow { reply_token } => {
                reply_token
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("webhook body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level webhook payload: `{ "destination": "...", "events": [...] }`.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

/// Outcome of decoding one raw event.
#[derive(Debug)]
pub enum DecodedEvent {
    Supported(InboundEvent),
    /// Valid event of a type we do not answer (unfollow, postback, sticker, image, ...).
    Unsupported(String),
    /// Could not be decoded at all.
    Malformed(String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum LineEvent {
    #[serde(rename = "message")]
    Message {
        #[serde(rename = "replyToken")]
        reply_token: String,
        #[serde(default)]
        source: Option<LineSource>,
        message: LineMessage,
    },
    #[serde(rename = "follow")]
    Follow {
        #[serde(rename = "replyToken")]
        reply_token: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct LineSource {
    #[serde(default, rename = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum LineMessage {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl WebhookEnvelope {
    /// Parse the raw body. Only a body that is not a JSON object with an (optional) events array fails.
    pub fn parse(body: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Decode each event in received order.
    pub fn decode_events(&self) -> Vec<DecodedEvent> {
        self.events.iter().map(decode_event).collect()
    }
}

fn event_type(raw: &serde_json::Value) -> String {
    raw.get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

pub fn decode_event(raw: &serde_json::Value) -> DecodedEvent {
    let event: LineEvent = match serde_json::from_value(raw.clone()) {
        Ok(e) => e,
        Err(e) => return DecodedEvent::Malformed(format!("{} event: {}", event_type(raw), e)),
    };
    match event {
        LineEvent::Message {
            reply_token,
            source,
            message: LineMessage::Text { text },
        } => DecodedEvent::Supported(InboundEvent::Message {
            text,
            sender_id: source.and_then(|s| s.user_id).unwrap_or_default(),
            reply_token,
        }),
        LineEvent::Message { .. } => {
            let kind = raw
                .get("message")
                .and_then(|m| m.get("type"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            DecodedEvent::Unsupported(format!("message/{}", kind))
        }
        LineEvent::Follow { reply_token } => {
            DecodedEvent::Supported(InboundEvent::Follow { reply_token })
        }
        LineEvent::Other => DecodedEvent::Unsupported(event_type(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_message_event() {
        let raw = json!({
            "type": "message",
            "replyToken": "r1",
            "source": { "type": "user", "userId": "U1" },
            "message": { "id": "1", "type": "text", "text": "What is HIV?" }
        });
        match decode_event(&raw) {
            DecodedEvent::Supported(ev) => assert_eq!(
                ev,
                InboundEvent::Message {
                    text: "What is HIV?".to_string(),
                    sender_id: "U1".to_string(),
                    reply_token: "r1".to_string(),
                }
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn follow_event() {
        let raw = json!({ "type": "follow", "replyToken": "r2", "source": { "userId": "U2" } });
        match decode_event(&raw) {
            DecodedEvent::Supported(ev) => {
                assert_eq!(ev.kind(), "follow");
                assert_eq!(ev.reply_token(), "r2");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_source_gives_empty_sender() {
        let raw = json!({
            "type": "message",
            "replyToken": "r",
            "message": { "type": "text", "text": "hi" }
        });
        match decode_event(&raw) {
            DecodedEvent::Supported(InboundEvent::Message { sender_id, .. }) => {
                assert_eq!(sender_id, "")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn sticker_and_unfollow_are_unsupported() {
        let sticker = json!({
            "type": "message",
            "replyToken": "r",
            "message": { "type": "sticker", "packageId": "1" }
        });
        assert!(matches!(decode_event(&sticker), DecodedEvent::Unsupported(k) if k == "message/sticker"));
        let unfollow = json!({ "type": "unfollow", "source": { "userId": "U" } });
        assert!(matches!(decode_event(&unfollow), DecodedEvent::Unsupported(k) if k == "unfollow"));
    }

    #[test]
    fn message_without_reply_token_is_malformed() {
        let raw = json!({ "type": "message", "message": { "type": "text", "text": "hi" } });
        assert!(matches!(decode_event(&raw), DecodedEvent::Malformed(_)));
    }

    #[test]
    fn envelope_keeps_event_order() {
        let body = br#"{"destination":"U0","events":[
            {"type":"follow","replyToken":"a"},
            {"type":"message","replyToken":"b","message":{"type":"text","text":"x"}}
        ]}"#;
        let env = WebhookEnvelope::parse(body).unwrap();
        let tokens: Vec<String> = env
            .decode_events()
            .into_iter()
            .filter_map(|d| match d {
                DecodedEvent::Supported(e) => Some(e.reply_token().to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(tokens, vec!["a", "b"]);
    }

    #[test]
    fn missing_events_is_empty() {
        let env = WebhookEnvelope::parse(br#"{"destination":"U0"}"#).unwrap();
        assert!(env.events.is_empty());
    }

    #[test]
    fn non_json_body_fails() {
        assert!(WebhookEnvelope::parse(b"not json").is_err());
        assert!(WebhookEnvelope::parse(b"[1,2]").is_err());
    }
}
