//! Minimal cookie helpers for the session and OAuth round-trip cookies

use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

pub const SESSION_COOKIE: &str = "session";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const INTENDED_COOKIE: &str = "intended_url";

/// Read a cookie value from every `Cookie` header on the request
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Build a `Set-Cookie` value. `max_age` of `None` makes a browser-session cookie.
pub fn set_cookie(name: &str, value: &str, max_age: Option<i64>, secure: bool) -> HeaderValue {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value);
    if let Some(seconds) = max_age {
        cookie.push_str(&format!("; Max-Age={}", seconds));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    // Values are base64url / urlencoded / JWT, all valid header bytes
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

pub fn clear_cookie(name: &str, secure: bool) -> HeaderValue {
    set_cookie(name, "", Some(0), secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1; session=tok.en"));
        headers.append(COOKIE, HeaderValue::from_static("oauth_state=xyz"));

        assert_eq!(read_cookie(&headers, "session").as_deref(), Some("tok.en"));
        assert_eq!(read_cookie(&headers, "oauth_state").as_deref(), Some("xyz"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_set_and_clear_cookie() {
        let value = set_cookie("session", "abc", Some(60), true);
        assert_eq!(
            value.to_str().unwrap(),
            "session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60; Secure"
        );

        let cleared = clear_cookie("session", false);
        assert_eq!(
            cleared.to_str().unwrap(),
            "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }
}
