//! Web server module for the WhatsApp webhook.
//!
//! This module provides:
//! - Twilio signature validation as an axum middleware (`auth`)
//! - Canonical URL and payload reconstruction (`public_url`, `payload`)
//! - HMAC-SHA1 signature computation (`signature`)
//! - The endpoint handlers and [`router`]

pub mod auth;
pub mod handlers;
pub mod payload;
pub mod public_url;
pub mod signature;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use auth::{authenticate, twilio_auth, ValidationResult, WebhookAuth, SIGNATURE_HEADER};
pub use handlers::{health, method_not_allowed, whatsapp_webhook, AppState, InboundMessage};
pub use payload::{CanonicalPayload, PayloadError};
pub use public_url::canonical_url;
pub use signature::{compute_signature, verify_signature, SharedSecret};

/// Path Twilio is configured to call for WhatsApp messages.
pub const WHATSAPP_WEBHOOK_PATH: &str = "/webhook/whatsapp";

/// Build the application router.
///
/// The auth middleware wraps every method on the webhook route, so even a
/// `GET` must carry a valid signature before it is told the method is wrong.
pub fn router(state: AppState, auth: WebhookAuth) -> Router {
    let webhook = post(whatsapp_webhook)
        .fallback(method_not_allowed)
        .layer(from_fn_with_state(Arc::new(auth), twilio_auth));

    Router::new()
        .route("/healthz", get(health))
        .route(WHATSAPP_WEBHOOK_PATH, webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
