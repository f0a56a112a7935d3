// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    middleware::Next,
    response::Response,
};
use tracing::{debug, enabled, Level};

use crate::common::safe_token_log;

/// Bodies larger than this are passed through without being logged
const MAX_LOGGED_BODY_BYTES: usize = 64 * 1024;

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/"))
        .unwrap_or(false)
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
}

/// Only request bodies with a known, small length are buffered; chunked
/// bodies of unknown size go to the handler untouched.
fn should_buffer_request(headers: &HeaderMap) -> bool {
    !is_multipart(headers)
        && declared_length(headers).is_some_and(|len| len <= MAX_LOGGED_BODY_BYTES)
}

fn is_small_response(headers: &HeaderMap) -> bool {
    declared_length(headers).map_or(true, |len| len <= MAX_LOGGED_BODY_BYTES)
}

fn render_body(bytes: &[u8]) -> Option<String> {
    let body_str = std::str::from_utf8(bytes).ok()?;
    // Pretty print JSON when possible
    Some(
        serde_json::from_str::<serde_json::Value>(body_str)
            .ok()
            .and_then(|json| serde_json::to_string_pretty(&json).ok())
            .unwrap_or_else(|| body_str.to_string()),
    )
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();

    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(safe_token_log);

    // Uploads stream straight to the handler
    let request = if !should_buffer_request(&parts.headers) {
        debug!(
            method = %parts.method,
            uri = %parts.uri,
            bearer = ?bearer,
            "📥 Request (body not logged)"
        );
        Request::from_parts(parts, body)
    } else {
        let bytes = to_bytes(body, MAX_LOGGED_BODY_BYTES)
            .await
            .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

        match render_body(&bytes).filter(|b| !b.is_empty()) {
            Some(request_body) => debug!(
                method = %parts.method,
                uri = %parts.uri,
                bearer = ?bearer,
                request_body = %request_body,
                "📥 Request"
            ),
            None => debug!(method = %parts.method, uri = %parts.uri, bearer = ?bearer, "📥 Request"),
        }

        Request::from_parts(parts, Body::from(bytes))
    };

    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    if !is_small_response(&parts.headers) {
        debug!(status = %parts.status, "📤 Response (body not logged)");
        return Ok(Response::from_parts(parts, body));
    }

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(response_body) = render_body(&bytes).filter(|b| !b.is_empty()) {
        debug!(
            status = %parts.status,
            response_body = %response_body,
            "📤 Response"
        );
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::CONTENT_LENGTH, HeaderValue};

    #[test]
    fn test_multipart_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_multipart(&headers));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=abc"),
        );
        assert!(is_multipart(&headers));
    }

    #[test]
    fn test_request_buffering_needs_small_declared_length() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        // Chunked: no length, so the body is passed through
        assert!(!should_buffer_request(&headers));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("512"));
        assert!(should_buffer_request(&headers));

        headers.insert(CONTENT_LENGTH, HeaderValue::from(MAX_LOGGED_BODY_BYTES + 1));
        assert!(!should_buffer_request(&headers));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("512"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=abc"),
        );
        assert!(!should_buffer_request(&headers));
    }

    #[test]
    fn test_response_without_length_is_logged() {
        let mut headers = HeaderMap::new();
        assert!(is_small_response(&headers));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(MAX_LOGGED_BODY_BYTES + 1));
        assert!(!is_small_response(&headers));
    }

    #[test]
    fn test_render_body_pretty_prints_json() {
        assert_eq!(
            render_body(br#"{"a":1}"#).as_deref(),
            Some("{\n  \"a\": 1\n}")
        );
        assert_eq!(render_body(b"plain").as_deref(), Some("plain"));
        assert_eq!(render_body(&[0xff, 0xfe]), None);
    }
}
