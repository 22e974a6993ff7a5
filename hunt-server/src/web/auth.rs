//! Twilio request authentication middleware.
//!
//! Every request to a protected route passes through [`authenticate`], which
//! settles on exactly one [`ValidationResult`]:
//!
//! ```text
//! no secret ─────────────────────────────► Bypassed
//! empty X-Twilio-Signature ──────────────► RejectedMissingSignature (403)
//! body unreadable / bad form ────────────► RejectedMalformedBody    (400)
//! HMAC-SHA1(url ‖ payload) != signature ─► RejectedSignatureMismatch (403)
//! otherwise ─────────────────────────────► Accepted
//! ```
//!
//! Only `Bypassed` and `Accepted` reach the wrapped handler, and always with
//! the full body readable from the start.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::payload::{buffer_body, media_type, CanonicalPayload};
use super::public_url::canonical_url;
use super::signature::{verify_signature, SharedSecret};

/// Header Twilio puts the request signature in.
pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

/// Immutable auth settings, built once from [`crate::Config`].
#[derive(Debug, Clone)]
pub struct WebhookAuth {
    secret: Option<SharedSecret>,
    public_base_url: Option<String>,
    max_body_bytes: usize,
}

impl WebhookAuth {
    /// Create auth settings. An empty `token` selects bypass mode; an empty
    /// `public_base_url` means the URL is derived from request headers.
    pub fn new(token: &str, public_base_url: &str, max_body_bytes: usize) -> Self {
        let base = public_base_url.trim().trim_end_matches('/');
        Self {
            secret: SharedSecret::from_token(token),
            public_base_url: (!base.is_empty()).then(|| base.to_string()),
            max_body_bytes,
        }
    }

    /// Whether signatures are enforced.
    pub fn is_enforcing(&self) -> bool {
        self.secret.is_some()
    }

    pub fn public_base_url(&self) -> Option<&str> {
        self.public_base_url.as_deref()
    }
}

/// Outcome of authenticating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    /// No secret configured; validation skipped (local development only).
    Bypassed,
    /// Signature verified.
    Accepted,
    RejectedMissingSignature,
    RejectedMalformedBody,
    RejectedSignatureMismatch,
}

impl ValidationResult {
    /// Whether the wrapped handler runs.
    pub fn is_forwarded(self) -> bool {
        matches!(self, ValidationResult::Bypassed | ValidationResult::Accepted)
    }

    /// Rejection status, `None` when the request is forwarded.
    pub fn status(self) -> Option<StatusCode> {
        match self {
            ValidationResult::Bypassed | ValidationResult::Accepted => None,
            ValidationResult::RejectedMissingSignature
            | ValidationResult::RejectedSignatureMismatch => Some(StatusCode::FORBIDDEN),
            ValidationResult::RejectedMalformedBody => Some(StatusCode::BAD_REQUEST),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValidationResult::Bypassed => "bypassed",
            ValidationResult::Accepted => "accepted",
            ValidationResult::RejectedMissingSignature => "rejected_missing_signature",
            ValidationResult::RejectedMalformedBody => "rejected_malformed_body",
            ValidationResult::RejectedSignatureMismatch => "rejected_signature_mismatch",
        }
    }
}

/// Run the authentication state machine for one request.
///
/// The returned request always carries a readable body: untouched when it was
/// never read, rebuilt from the buffered bytes otherwise.
pub async fn authenticate(auth: &WebhookAuth, request: Request) -> (ValidationResult, Request) {
    let Some(secret) = auth.secret.as_ref() else {
        return (ValidationResult::Bypassed, request);
    };

    let signature = match request.headers().get(SIGNATURE_HEADER) {
        Some(v) if !v.is_empty() => v.as_bytes().to_vec(),
        _ => return (ValidationResult::RejectedMissingSignature, request),
    };

    let (parts, body) = request.into_parts();
    let url = canonical_url(&parts, auth.public_base_url());
    let content_type = media_type(&parts.headers);

    let bytes = match buffer_body(body, auth.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, url = %url, "twilio_body_unreadable");
            let request = Request::from_parts(parts, Body::empty());
            return (ValidationResult::RejectedMalformedBody, request);
        }
    };

    let result = match CanonicalPayload::from_body(content_type.as_deref(), &bytes) {
        Ok(payload) if verify_signature(secret, &url, &payload, &signature) => {
            ValidationResult::Accepted
        }
        Ok(_) => {
            warn!(
                url = %url,
                content_type = content_type.as_deref().unwrap_or(""),
                signature_length = signature.len(),
                "twilio_signature_mismatch"
            );
            ValidationResult::RejectedSignatureMismatch
        }
        Err(e) => {
            warn!(error = %e, url = %url, "twilio_form_malformed");
            ValidationResult::RejectedMalformedBody
        }
    };

    (result, Request::from_parts(parts, Body::from(bytes)))
}

/// Axum middleware enforcing Twilio signatures on the wrapped routes.
///
/// Install with `axum::middleware::from_fn_with_state(auth, twilio_auth)`.
pub async fn twilio_auth(
    State(auth): State<Arc<WebhookAuth>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let (result, request) = authenticate(&auth, request).await;

    match result {
        ValidationResult::Bypassed => {
            debug!(path = %path, outcome = result.as_str(), "twilio_auth_bypassed");
            next.run(request).await
        }
        ValidationResult::Accepted => {
            debug!(path = %path, outcome = result.as_str(), "twilio_auth_accepted");
            next.run(request).await
        }
        rejected => {
            warn!(path = %path, outcome = rejected.as_str(), "twilio_auth_rejected");
            rejected.into_response()
        }
    }
}

impl IntoResponse for ValidationResult {
    fn into_response(self) -> Response {
        let message = match self {
            ValidationResult::RejectedMissingSignature => "missing signature",
            ValidationResult::RejectedMalformedBody => "bad body",
            ValidationResult::RejectedSignatureMismatch => "invalid signature",
            ValidationResult::Bypassed | ValidationResult::Accepted => "ok",
        };
        (self.status().unwrap_or(StatusCode::OK), message).into_response()
    }
}
