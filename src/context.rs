//! Request-scoped identity and one-shot flash messages.
//!
//! Authentication happens upstream; the login service forwards the user as
//! `x-user-id`, `x-user-name` and `x-user-role` headers. A request without an
//! identity is redirected to the login page.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::Redirect,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::AppState;
use crate::domain::Role;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RequestContext {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl RequestContext {
    /// Read the identity headers. A missing role means the least privileged one.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id = header_text(headers, USER_ID_HEADER)?;
        let username = header_text(headers, USER_NAME_HEADER)?;
        let role = header_text(headers, USER_ROLE_HEADER)
            .map_or(Role::Student, |r| Role::parse(&r));

        Some(Self {
            user_id,
            username,
            role,
        })
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers).ok_or_else(|| {
            tracing::debug!(path = %parts.uri.path(), "Unauthenticated request, redirecting to login");
            Redirect::to(&state.config.login_url)
        })
    }
}

/// Pending flash message from the request cookies, if any.
#[must_use]
pub fn read_flash(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == FLASH_COOKIE)
        .map(|(_, value)| decode_cookie_value(value))
        .filter(|m| !m.is_empty())
}

/// `Set-Cookie` value queueing `message` for the next page load.
#[must_use]
pub fn set_flash_cookie(message: &str) -> HeaderValue {
    let cookie = format!(
        "{FLASH_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=300",
        encode_cookie_value(message)
    );
    // Encoded value is ASCII only
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("flash=; Path=/"))
}

/// `Set-Cookie` value removing a consumed flash message.
#[must_use]
pub fn clear_flash_cookie() -> HeaderValue {
    HeaderValue::from_static("flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Percent-encode everything outside unreserved characters.
#[must_use]
pub fn encode_cookie_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Inverse of [`encode_cookie_value`]. Malformed escapes are kept literally.
#[must_use]
pub fn decode_cookie_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
