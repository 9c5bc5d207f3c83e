//! GitHub webhook signature verification (`X-Hub-Signature`, HMAC-SHA1).
//!
//! Verification consumes the raw request bytes exactly as received; it must
//! run before the body is parsed as JSON, since re-serialization would not
//! reproduce the digest.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use tracing::{debug, warn};

use crate::error::{HookError, Result};

type HmacSha1 = Hmac<Sha1>;

/// Outcome of a signature check that did not hard-fail.
///
/// `NoSignature` and `NoSecret` are deliberate pass-throughs for deployments
/// without a shared secret; they are distinct so callers can log them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Header present, secret configured, digest matched.
    Verified,
    /// No `X-Hub-Signature` header on the request.
    NoSignature,
    /// A signature was sent but no secret is configured.
    NoSecret,
}

/// Parses an `X-Hub-Signature` header value (e.g. "sha1=abc123...") into raw bytes.
/// Returns `None` for malformed headers.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha1=")?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA1 of a payload with the given secret.
/// Exposed so tests can generate expected signatures.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a GitHub-style header value, "sha1=<hex>".
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha1={}", hex::encode(signature))
}

/// Verifies the authenticity of a request body against its signature header.
///
/// A mismatched or malformed signature is a hard rejection
/// (`HookError::InvalidSignature`, mapped to HTTP 403 by the handler).
pub fn verify_signature(
    secret: Option<&str>,
    payload: &[u8],
    signature_header: Option<&str>,
) -> Result<SignatureStatus> {
    let Some(header) = signature_header else {
        debug!("No GitHub signature found");
        return Ok(SignatureStatus::NoSignature);
    };

    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        warn!("Received an X-Hub-Signature header, but cannot validate as no secret is configured");
        return Ok(SignatureStatus::NoSecret);
    };

    let received_sig = parse_signature_header(header).ok_or(HookError::InvalidSignature)?;

    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).map_err(|_| HookError::InvalidSignature)?;
    mac.update(payload);

    // Constant-time comparison via the HMAC library
    if mac.verify_slice(&received_sig).is_err() {
        warn!("Received an invalid HMAC for X-Hub-Signature");
        return Err(HookError::InvalidSignature);
    }

    debug!("GitHub signature successfully verified");
    Ok(SignatureStatus::Verified)
}
