//! LINE webhook signature: base64(HMAC-SHA256(channel secret, raw body)).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature. `HeaderMap` lookups are case-insensitive.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

fn keyed_digest(body: &[u8], secret: &[u8]) -> Result<HmacSha256, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(body);
    Ok(mac)
}

/// Check `signature` against the raw request body.
///
/// An empty secret means verification is switched off and every body is accepted;
/// production deployments must configure one. The header value is used exactly as
/// received. A value that is not valid base64 fails the same way a mismatched digest
/// does. The digest comparison is constant-time.
pub fn verify(body: &[u8], signature: &str, secret: &[u8]) -> bool {
    if secret.is_empty() {
        return true;
    }
    let Ok(provided) = STANDARD.decode(signature) else {
        return false;
    };
    match keyed_digest(body, secret) {
        Ok(mac) => mac.verify_slice(&provided).is_ok(),
        Err(_) => false,
    }
}

/// Compute the header value LINE would send for `body`.
pub fn sign(body: &[u8], secret: &[u8]) -> Result<String, InvalidLength> {
    let mac = keyed_digest(body, secret)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
