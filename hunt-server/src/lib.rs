//! Scavenger Hunt - WhatsApp scavenger hunt webhook server.
//!
//! Twilio delivers WhatsApp messages to `/webhook/whatsapp`. Every delivery
//! is authenticated by recomputing Twilio's `X-Twilio-Signature` before the
//! handler runs.
//!
//! ## Request Flow
//!
//! ```text
//! Twilio → proxy → twilio_auth (url + payload + HMAC-SHA1) → whatsapp_webhook → TwiML
//! ```

pub mod clues;
pub mod config;
pub mod twiml;
pub mod web;

// Re-export commonly used types
pub use clues::{load_clues, Clue, ClueError};
pub use config::Config;
pub use web::{router, AppState, ValidationResult, WebhookAuth};
