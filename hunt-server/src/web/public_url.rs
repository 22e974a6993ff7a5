//! Reconstruction of the public URL Twilio signed.
//!
//! Behind a reverse proxy the request this server sees is not the request
//! Twilio sent: scheme and host are usually rewritten. The signature covers
//! the URL as Twilio saw it, so it has to be rebuilt byte for byte.

use axum::http::{header, request::Parts, HeaderMap};

/// Header carrying the client-facing scheme set by a reverse proxy.
pub const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Header carrying the client-facing host set by a reverse proxy.
pub const FORWARDED_HOST: &str = "x-forwarded-host";

/// Build the canonical URL for a request.
///
/// With a non-empty `public_base` the override replaces scheme and host.
/// Otherwise the forwarding headers win over the connection's own view.
/// The query string is appended verbatim.
pub fn canonical_url(parts: &Parts, public_base: Option<&str>) -> String {
    let mut url = match public_base.filter(|b| !b.is_empty()) {
        Some(base) => base.to_string(),
        None => format!("{}://{}", scheme(parts), host(parts)),
    };

    url.push_str(parts.uri.path());

    if let Some(query) = parts.uri.query().filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }

    url
}

fn scheme(parts: &Parts) -> String {
    if let Some(proto) = non_empty_header(&parts.headers, FORWARDED_PROTO) {
        return proto.to_string();
    }

    // The listener speaks plain HTTP, so the request URI is the only place
    // an encrypted scheme can show up (absolute-form or HTTP/2 `:scheme`).
    let encrypted = parts.uri.scheme_str() == Some("https");

    let scheme = if encrypted { "https" } else { "http" };
    scheme.to_string()
}

/// Forwarded host, else the absolute-form URI authority, else `Host`.
fn host(parts: &Parts) -> String {
    if let Some(forwarded) = non_empty_header(&parts.headers, FORWARDED_HOST) {
        return forwarded.to_string();
    }

    parts
        .uri
        .authority()
        .map(|a| a.to_string())
        .or_else(|| non_empty_header(&parts.headers, header::HOST.as_str()).map(str::to_string))
        .unwrap_or_default()
}

fn non_empty_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().method("POST").uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_forwarded_headers_win() {
        let p = parts(
            "/webhook/whatsapp",
            &[
                ("host", "10.0.0.5:8080"),
                ("x-forwarded-proto", "https"),
                ("x-forwarded-host", "example.org"),
            ],
        );
        assert_eq!(canonical_url(&p, None), "https://example.org/webhook/whatsapp");
    }

    #[test]
    fn test_plain_host_without_proxy() {
        let p = parts("/webhook/whatsapp", &[("host", "localhost:8080")]);
        assert_eq!(canonical_url(&p, None), "http://localhost:8080/webhook/whatsapp");
    }

    #[test]
    fn test_absolute_uri_authority_beats_host_header() {
        let p = parts(
            "http://hunt.example.com/webhook/whatsapp?x=1",
            &[("host", "10.0.0.5:8080")],
        );
        assert_eq!(
            canonical_url(&p, None),
            "http://hunt.example.com/webhook/whatsapp?x=1"
        );
    }

    #[test]
    fn test_forwarded_host_beats_absolute_uri() {
        let p = parts(
            "http://internal:8080/webhook/whatsapp",
            &[("x-forwarded-host", "example.org"), ("x-forwarded-proto", "https")],
        );
        assert_eq!(canonical_url(&p, None), "https://example.org/webhook/whatsapp");
    }

    #[test]
    fn test_absolute_https_uri() {
        let p = parts("https://hunt.example.com/webhook/whatsapp", &[]);
        assert_eq!(canonical_url(&p, None), "https://hunt.example.com/webhook/whatsapp");
    }

    #[test]
    fn test_override_replaces_scheme_and_host() {
        let p = parts(
            "/webhook/whatsapp?round=2&team=blue",
            &[
                ("host", "internal:8080"),
                ("x-forwarded-proto", "http"),
                ("x-forwarded-host", "proxy.local"),
            ],
        );
        assert_eq!(
            canonical_url(&p, Some("https://hunt.example.com")),
            "https://hunt.example.com/webhook/whatsapp?round=2&team=blue"
        );
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let p = parts("/webhook/whatsapp", &[("host", "localhost")]);
        assert_eq!(canonical_url(&p, Some("")), "http://localhost/webhook/whatsapp");
    }

    #[test]
    fn test_query_passed_through_untouched() {
        let p = parts(
            "/webhook/whatsapp?z=1&a=%2B2&a=3",
            &[("host", "example.org"), ("x-forwarded-proto", "https")],
        );
        assert_eq!(
            canonical_url(&p, None),
            "https://example.org/webhook/whatsapp?z=1&a=%2B2&a=3"
        );
    }

    #[test]
    fn test_empty_query_has_no_question_mark() {
        let p = parts("/webhook/whatsapp?", &[("host", "example.org")]);
        assert_eq!(canonical_url(&p, None), "http://example.org/webhook/whatsapp");
    }

    #[test]
    fn test_empty_forwarded_headers_fall_back() {
        let p = parts(
            "/webhook/whatsapp",
            &[
                ("host", "example.org"),
                ("x-forwarded-proto", ""),
                ("x-forwarded-host", ""),
            ],
        );
        assert_eq!(canonical_url(&p, None), "http://example.org/webhook/whatsapp");
    }

    #[test]
    fn test_deterministic() {
        let p = parts(
            "/webhook/whatsapp?x=1",
            &[("x-forwarded-proto", "https"), ("x-forwarded-host", "example.org")],
        );
        assert_eq!(canonical_url(&p, None), canonical_url(&p, None));
    }
}
