//! LINE channel: webhook event decoding (inbound) and the reply API (outbound).

mod inbound;
mod line;

pub use inbound::{decode_event, DecodedEvent, EnvelopeError, InboundEvent, WebhookEnvelope};
pub use line::{truncate_for_line, DispatchError, LineClient, ReplySender, MAX_TEXT_CHARS};
