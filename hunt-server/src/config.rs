//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at startup. Request handling code never
//! touches the environment; it receives the values it needs through
//! [`WebhookAuth`] and the shared application state.

use std::env;
use tracing::warn;

use crate::web::WebhookAuth;

/// Default location of the clue catalogue.
pub const DEFAULT_CLUES_PATH: &str = "config/clues.json";

/// Default upper bound on a buffered webhook body (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Twilio auth token used as the HMAC key, verbatim. Only an empty value
    /// disables validation.
    pub twilio_auth_token: String,

    /// Externally visible base URL (scheme + host), trailing slashes removed.
    /// Empty means "derive from the request headers".
    pub public_base_url: String,

    /// Path to the clue catalogue JSON file
    pub clues_path: String,

    /// Maximum number of body bytes buffered for signature validation
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 8080),

            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),

            public_base_url: normalize_base_url(
                &env::var("PUBLIC_BASE_URL").unwrap_or_default(),
            ),

            clues_path: env::var("CLUES_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CLUES_PATH.to_string()),

            max_body_bytes: parse_or("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
        }
    }

    /// Whether inbound webhooks will have their signatures checked.
    pub fn signature_validation_enabled(&self) -> bool {
        !self.twilio_auth_token.is_empty()
    }

    /// Build the immutable settings handed to the webhook auth middleware.
    pub fn webhook_auth(&self) -> WebhookAuth {
        WebhookAuth::new(
            &self.twilio_auth_token,
            &self.public_base_url,
            self.max_body_bytes,
        )
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field(
                "twilio_auth_token",
                &if self.signature_validation_enabled() {
                    "[redacted]"
                } else {
                    ""
                },
            )
            .field("public_base_url", &self.public_base_url)
            .field("clues_path", &self.clues_path)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

/// Strip surrounding whitespace and any trailing slashes from a base URL.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Parse a numeric environment variable, falling back to `default` when it is
/// unset or invalid.
fn parse_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}
