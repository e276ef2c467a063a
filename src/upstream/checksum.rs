//! Canonical request serialization and the two checksum flavours.
//!
//! Outbound requests are signed over a sorted, `&`-joined token set rendered
//! as lowercase hex. Inbound callbacks are checked against `body || secret`
//! rendered as padded URL-safe base64. The backend implements both shapes, so
//! they stay distinct.

use base64ct::{Base64Url, Encoding};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Outcome of a callback checksum comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

/// Render the signable fields of a request into the canonical byte string.
///
/// Caller tokens, the raw body (one opaque token) and `t=`/`r=` are sorted
/// bytewise, then `secret=` is appended last and everything is joined with `&`.
/// Tokens are neither deduplicated nor decomposed.
#[must_use]
pub fn canonicalize<T: AsRef<str>>(
    tokens: &[T],
    body: Option<&[u8]>,
    secret: &str,
    timestamp: i64,
    nonce: &str,
) -> Vec<u8> {
    let timestamp_token = format!("t={timestamp}");
    let nonce_token = format!("r={nonce}");

    let mut sorted: Vec<&[u8]> = tokens.iter().map(|t| t.as_ref().as_bytes()).collect();
    if let Some(body) = body {
        sorted.push(body);
    }
    sorted.push(timestamp_token.as_bytes());
    sorted.push(nonce_token.as_bytes());
    sorted.sort_unstable();

    let secret_token = format!("secret={secret}");
    sorted.push(secret_token.as_bytes());

    sorted.join(&b'&')
}

/// SHA-256 of the canonical string as lowercase hex.
#[must_use]
pub fn sign(canonical: &[u8]) -> String {
    format!("{:x}", Sha256::digest(canonical))
}

/// Expected `X-CHECKSUM` of a callback: URL-safe base64 of `SHA-256(body || secret)`.
#[must_use]
pub fn callback_checksum(body: &[u8], secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hasher.update(secret.as_bytes());
    Base64Url::encode_string(&hasher.finalize())
}

/// Compare a supplied callback checksum against the expected one.
#[must_use]
pub fn verify_callback(body: &[u8], supplied: &str, secret: &str) -> Verdict {
    let expected = callback_checksum(body, secret);

    if bool::from(expected.as_bytes().ct_eq(supplied.as_bytes())) {
        Verdict::Accept
    } else {
        Verdict::Reject
    }
}
