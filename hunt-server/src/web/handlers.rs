//! HTTP endpoint handlers.
//!
//! `/webhook/whatsapp` only ever runs after [`super::auth::twilio_auth`] has
//! accepted (or bypassed) the request, so the handlers here trust their input.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{error, info};
use url::form_urlencoded;

use super::payload::{media_type, FORM_URLENCODED};
use crate::clues::Clue;
use crate::twiml::{message_reply, TWIML_CONTENT_TYPE};
use crate::Config;

/// Reply sent to every authenticated WhatsApp message.
pub const REPLY_TEXT: &str = "Yay, valid requests!";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub clues: Arc<Vec<Clue>>,
}

impl AppState {
    pub fn new(config: Config, clues: Vec<Clue>) -> Self {
        Self {
            config: Arc::new(config),
            clues: Arc::new(clues),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check endpoint.
pub async fn health() -> &'static str {
    "ok"
}

// =============================================================================
// WhatsApp Webhook
// =============================================================================

/// Fields of an inbound Twilio WhatsApp message that get logged.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    pub body: String,
}

impl InboundMessage {
    /// Read `From` and `Body` (first value each) from a form-encoded body.
    /// Other content types yield empty fields.
    pub fn from_form(headers: &HeaderMap, body: &[u8]) -> Self {
        let mut message = InboundMessage::default();
        if media_type(headers).as_deref() != Some(FORM_URLENCODED) {
            return message;
        }

        let mut seen_from = false;
        let mut seen_body = false;
        for (name, value) in form_urlencoded::parse(body) {
            match name.as_ref() {
                "From" if !seen_from => {
                    message.from = value.into_owned();
                    seen_from = true;
                }
                "Body" if !seen_body => {
                    message.body = value.into_owned();
                    seen_body = true;
                }
                _ => {}
            }
        }
        message
    }
}

/// WhatsApp webhook endpoint.
///
/// Logs the sender and message text, then answers with a TwiML message.
pub async fn whatsapp_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let message = InboundMessage::from_form(&headers, &body);

    let reply = match message_reply(REPLY_TEXT) {
        Ok(xml) => xml,
        Err(e) => {
            error!(error = %e, "twiml_render_failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    info!(
        from = %message.from,
        body = ?message.body,
        clues_loaded = state.clues.len(),
        "whatsapp_message_received"
    );

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)],
        reply,
    )
        .into_response()
}

/// Fallback for non-POST requests to the webhook route.
pub async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}
