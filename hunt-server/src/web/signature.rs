//! Twilio webhook signature computation and verification.
//!
//! Twilio signs webhook requests using HMAC-SHA1 keyed with the account's
//! auth token, base64-encoded, and sent in the `X-Twilio-Signature` header.
//! Reference: https://www.twilio.com/docs/usage/webhooks/webhooks-security

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

use super::payload::CanonicalPayload;

type HmacSha1 = Hmac<Sha1>;

/// The auth token used as the HMAC key.
///
/// Never printed: `Debug` is redacted.
#[derive(Clone)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Wrap a configured token. Only the empty token means "no secret
    /// configured" and yields `None`; any other value is used verbatim.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.is_empty() {
            None
        } else {
            Some(SharedSecret(token.as_bytes().to_vec()))
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret([redacted])")
    }
}

/// Compute the base64 signature Twilio would send for `url` and `payload`.
pub fn compute_signature(secret: &SharedSecret, url: &str, payload: &CanonicalPayload) -> String {
    sign(secret, &payload.signing_base(url))
}

/// Verify a Twilio signature.
///
/// # Arguments
///
/// * `secret` - The account auth token
/// * `url` - The canonical URL Twilio requested
/// * `payload` - The canonicalized request body
/// * `signature` - The raw `X-Twilio-Signature` header value
///
/// # Returns
///
/// `true` if the signature matches. The comparison runs in constant time.
pub fn verify_signature(
    secret: &SharedSecret,
    url: &str,
    payload: &CanonicalPayload,
    signature: &[u8],
) -> bool {
    let expected = compute_signature(secret, url, payload);
    expected.as_bytes().ct_eq(signature).into()
}

fn sign(secret: &SharedSecret, base: &[u8]) -> String {
    // HMAC accepts keys of any length, so this never fails in practice.
    let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(base);
    BASE64.encode(mac.finalize().into_bytes())
}
