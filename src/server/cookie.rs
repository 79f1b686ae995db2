//! `session_token` cookie: parsing from request headers and `Set-Cookie` formatting.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

use crate::error::{AuthError, AuthResult};
use crate::identity::{Session, SessionCookie};

pub const SESSION_COOKIE: &str = "session_token";

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(s) = value.to_str() else { continue };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k.trim() == name {
                    return Some(v.trim().to_string());
                }
            }
        }
    }
    None
}

/// The session carrier on a request, if any. Request cookies never declare an expiry.
pub fn session_cookie(headers: &HeaderMap) -> Option<SessionCookie> {
    parse_cookie(headers, SESSION_COOKIE).map(SessionCookie::new)
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn cookie_header(value: &str, expires: DateTime<Utc>) -> AuthResult<HeaderValue> {
    HeaderValue::from_str(&format!("{}={}; Path=/; HttpOnly; Expires={}", SESSION_COOKIE, value, http_date(expires)))
        .map_err(|e| AuthError::internal(format!("invalid cookie header: {e}")))
}

pub fn set_session_cookie(session: &Session) -> AuthResult<HeaderValue> {
    cookie_header(&session.token, session.expires_at)
}

pub fn clear_session_cookie(now: DateTime<Utc>) -> AuthResult<HeaderValue> {
    cookie_header("", now)
}
