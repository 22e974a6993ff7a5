//! Canonical payload construction for Twilio signature validation.
//!
//! Twilio signs one of two things after the URL:
//! - form-encoded webhooks: every POST parameter name followed by its value,
//!   names sorted, no separators;
//! - anything else: the raw body bytes exactly as sent.

use std::collections::BTreeMap;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, HeaderMap};
use percent_encoding::percent_decode;
use thiserror::Error;

/// Media type Twilio uses for classic webhooks.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Reasons a webhook body could not be turned into a canonical payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Reading the request body failed, or it exceeded the size limit.
    #[error("failed to read request body: {0}")]
    BodyUnreadable(String),

    /// The body claimed to be form-encoded but could not be parsed.
    #[error("malformed form body: {0}")]
    BodyMalformedForm(String),
}

/// What gets appended to the canonical URL before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalPayload {
    /// First value of each form field, keyed and ordered by the decoded
    /// field name bytes. Names and values are not required to be UTF-8.
    FormEncoded(BTreeMap<Vec<u8>, Vec<u8>>),
    /// The untouched request body.
    Raw(Bytes),
}

impl CanonicalPayload {
    /// Canonicalize an already-buffered body according to its media type.
    pub fn from_body(media_type: Option<&str>, body: &Bytes) -> Result<Self, PayloadError> {
        match media_type {
            Some(FORM_URLENCODED) => parse_form(body).map(CanonicalPayload::FormEncoded),
            _ => Ok(CanonicalPayload::Raw(body.clone())),
        }
    }

    /// Append the signed representation of this payload to `out`.
    pub fn append_to(&self, out: &mut Vec<u8>) {
        match self {
            CanonicalPayload::FormEncoded(fields) => {
                for (name, value) in fields {
                    out.extend_from_slice(name);
                    out.extend_from_slice(value);
                }
            }
            CanonicalPayload::Raw(bytes) => out.extend_from_slice(bytes),
        }
    }

    /// Concatenate the canonical URL and this payload into the signing base.
    pub fn signing_base(&self, url: &str) -> Vec<u8> {
        let mut base = Vec::with_capacity(url.len() + self.len_hint());
        base.extend_from_slice(url.as_bytes());
        self.append_to(&mut base);
        base
    }

    fn len_hint(&self) -> usize {
        match self {
            CanonicalPayload::FormEncoded(fields) => {
                fields.iter().map(|(k, v)| k.len() + v.len()).sum()
            }
            CanonicalPayload::Raw(bytes) => bytes.len(),
        }
    }
}

/// Lower-cased media type of the request, parameters stripped.
pub fn media_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let essence = raw.split(';').next().unwrap_or_default().trim();
    if essence.is_empty() {
        return None;
    }
    Some(essence.to_ascii_lowercase())
}

/// Drain a body into memory, bounded by `limit` bytes.
///
/// The returned bytes are cheap to clone, so the caller can hand a fresh
/// `Body` to the next handler after inspecting them.
pub async fn buffer_body(body: Body, limit: usize) -> Result<Bytes, PayloadError> {
    to_bytes(body, limit)
        .await
        .map_err(|e| PayloadError::BodyUnreadable(e.to_string()))
}

/// Parse a form body keeping only the first value per field.
///
/// Decoding is byte-exact: `+` becomes a space and `%XX` the raw byte, with
/// no UTF-8 validation or replacement.
fn parse_form(body: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, PayloadError> {
    check_form_syntax(body)?;

    let mut fields = BTreeMap::new();
    for pair in body.split(|b| *b == b'&').filter(|p| !p.is_empty()) {
        let (name, value) = match pair.iter().position(|b| *b == b'=') {
            Some(eq) => (&pair[..eq], &pair[eq + 1..]),
            None => (pair, &[][..]),
        };
        fields
            .entry(form_decode(name))
            .or_insert_with(|| form_decode(value));
    }

    Ok(fields)
}

fn form_decode(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|b| if *b == b'+' { b' ' } else { *b })
        .collect();
    percent_decode(&spaced).collect()
}

/// Reject bodies a strict form parser would refuse: `;` separators and
/// percent signs not followed by two hex digits.
fn check_form_syntax(body: &[u8]) -> Result<(), PayloadError> {
    if body.contains(&b';') {
        return Err(PayloadError::BodyMalformedForm(
            "invalid semicolon separator".to_string(),
        ));
    }

    let mut i = 0;
    while i < body.len() {
        if body[i] == b'%' {
            let escape = body.get(i + 1..i + 3);
            let valid = matches!(escape, Some(hex) if hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(PayloadError::BodyMalformedForm(format!(
                    "invalid percent escape at byte {}",
                    i
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(body: &str) -> CanonicalPayload {
        CanonicalPayload::from_body(Some(FORM_URLENCODED), &Bytes::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_form_fields_sorted_and_decoded() {
        let payload = form("From=%2B15551234567&Body=Hi");
        let base = payload.signing_base("https://example.org/webhook/whatsapp");
        assert_eq!(
            base,
            b"https://example.org/webhook/whatsappBodyHiFrom+15551234567".to_vec()
        );
    }

    #[test]
    fn test_form_order_independent() {
        let a = form("Body=Hi&From=%2B15551234567&To=whatsapp%3A%2B14155238886");
        let b = form("To=whatsapp%3A%2B14155238886&Body=Hi&From=%2B15551234567");
        assert_eq!(a, b);
        assert_eq!(a.signing_base("u"), b.signing_base("u"));
    }

    #[test]
    fn test_form_keeps_first_value() {
        let payload = form("Tag=first&Tag=second");
        assert_eq!(payload.signing_base(""), b"Tagfirst".to_vec());
    }

    #[test]
    fn test_form_sorts_by_byte_order() {
        // Upper-case letters sort before lower-case ones.
        let payload = form("apple=1&Zebra=2&Body=3");
        assert_eq!(payload.signing_base(""), b"Body3Zebra2apple1".to_vec());
    }

    #[test]
    fn test_form_plus_is_space() {
        let payload = form("Body=Where+is+clue+2%3F");
        assert_eq!(payload.signing_base(""), b"BodyWhere is clue 2?".to_vec());
    }

    #[test]
    fn test_empty_form() {
        let payload = form("");
        assert_eq!(payload, CanonicalPayload::FormEncoded(BTreeMap::new()));
    }

    #[test]
    fn test_form_non_utf8_value_kept_as_bytes() {
        let payload = form("Body=%FF");
        assert_eq!(payload.signing_base("u"), b"uBody\xff".to_vec());
    }

    #[test]
    fn test_form_non_utf8_names_stay_distinct() {
        let payload = form("%FF=2&%FE=1&Body=%E2%9C%93");
        assert_eq!(
            payload.signing_base(""),
            b"Body\xe2\x9c\x93\xfe1\xff2".to_vec()
        );
    }

    #[test]
    fn test_form_name_without_value() {
        let payload = form("Flag&&Body=Hi");
        assert_eq!(payload.signing_base(""), b"BodyHiFlag".to_vec());
    }

    #[test]
    fn test_form_bad_escape_rejected() {
        let result = CanonicalPayload::from_body(Some(FORM_URLENCODED), &Bytes::from_static(b"Body=%zz"));
        assert!(matches!(result, Err(PayloadError::BodyMalformedForm(_))));

        let result = CanonicalPayload::from_body(Some(FORM_URLENCODED), &Bytes::from_static(b"Body=100%"));
        assert!(matches!(result, Err(PayloadError::BodyMalformedForm(_))));
    }

    #[test]
    fn test_form_semicolon_rejected() {
        let result = CanonicalPayload::from_body(Some(FORM_URLENCODED), &Bytes::from_static(b"a=1;b=2"));
        assert!(matches!(result, Err(PayloadError::BodyMalformedForm(_))));
    }

    #[test]
    fn test_raw_body_untouched() {
        let body = Bytes::from_static(br#"{"a":1}"#);
        let payload = CanonicalPayload::from_body(Some("application/json"), &body).unwrap();
        assert_eq!(payload, CanonicalPayload::Raw(body));
        assert_eq!(payload.signing_base("https://x/y"), br#"https://x/y{"a":1}"#.to_vec());
    }

    #[test]
    fn test_raw_body_never_parsed() {
        let body = Bytes::from_static(b"not json %zz ; \xff");
        let payload = CanonicalPayload::from_body(Some("application/json"), &body).unwrap();
        assert_eq!(payload, CanonicalPayload::Raw(body));

        let body = Bytes::from_static(b"%%%");
        let payload = CanonicalPayload::from_body(None, &body).unwrap();
        assert_eq!(payload, CanonicalPayload::Raw(body));
    }

    #[test]
    fn test_media_type() {
        let mut headers = HeaderMap::new();
        assert_eq!(media_type(&headers), None);

        headers.insert(
            header::CONTENT_TYPE,
            "Application/X-WWW-Form-Urlencoded; charset=UTF-8".parse().unwrap(),
        );
        assert_eq!(media_type(&headers).as_deref(), Some(FORM_URLENCODED));

        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        assert_eq!(media_type(&headers).as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_buffer_body_within_limit() {
        let bytes = buffer_body(Body::from("Body=Hi"), 64).await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"Body=Hi"));
    }

    #[tokio::test]
    async fn test_buffer_body_over_limit() {
        let result = buffer_body(Body::from(vec![b'x'; 128]), 16).await;
        assert!(matches!(result, Err(PayloadError::BodyUnreadable(_))));
    }
}
