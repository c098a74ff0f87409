//! Webhook signature verification
//!
//! LINE signs each webhook body with HMAC-SHA256 keyed by the channel secret
//! and sends the base64 digest in the `X-Line-Signature` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{Error, Result};

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "x-line-signature";

type HmacSha256 = Hmac<Sha256>;

/// Compute the base64 signature of `body`
///
/// # Errors
///
/// Returns `Error::Signature` if the MAC cannot be keyed with the secret
pub fn sign(channel_secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = new_mac(channel_secret)?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify a signature header value against `body`
///
/// # Errors
///
/// Returns `Error::Signature` if the header is not valid base64 or does not
/// match the body
pub fn verify(channel_secret: &str, body: &[u8], signature: &str) -> Result<()> {
    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|e| Error::Signature(format!("malformed signature: {e}")))?;

    let mut mac = new_mac(channel_secret)?;
    mac.update(body);

    // Constant-time comparison
    mac.verify_slice(&expected)
        .map_err(|_| Error::Signature("signature does not match body".to_string()))
}

fn new_mac(channel_secret: &str) -> Result<HmacSha256> {
    <HmacSha256 as Mac>::new_from_slice(channel_secret.as_bytes())
        .map_err(|e| Error::Signature(format!("failed to create HMAC: {e}")))
}
