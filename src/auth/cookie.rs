//! Cookie transport for tokens.

use axum::http::{HeaderMap, HeaderValue, header};

/// Cookie name for the access token (short-lived, 15 minutes).
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Cookie name for the refresh token (long-lived, 3 days).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Build a `Set-Cookie` value: http-only, scoped to `/`, living `max_age` seconds.
pub fn build_cookie(name: &str, value: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        name, value, max_age, secure
    )
}

/// Attach a cookie to a response.
pub fn attach_cookie(headers: &mut HeaderMap, name: &str, value: &str, max_age: u64, secure: bool) {
    append_set_cookie(headers, build_cookie(name, value, max_age, secure));
}

/// Overwrite a cookie with an empty value that expires immediately.
pub fn expire_cookie(headers: &mut HeaderMap, name: &str, secure: bool) {
    append_set_cookie(headers, build_cookie(name, "", 0, secure));
}

fn append_set_cookie(headers: &mut HeaderMap, cookie: String) {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "Refusing to set unencodable cookie"),
    }
}

/// Extract a cookie value from the Cookie header. Empty values count as absent.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                let value = value.trim();
                return (!value.is_empty()).then_some(value);
            }
        }
    }
    None
}

/// Extract a token from `Authorization: Bearer <token>`.
pub fn get_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Access token from its cookie, falling back to the bearer header.
pub fn get_access_token(headers: &HeaderMap) -> Option<&str> {
    get_cookie(headers, ACCESS_COOKIE_NAME).or_else(|| get_bearer_token(headers))
}
