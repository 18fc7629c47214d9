//! Bearer token injection for requests forwarded to the backend API
//!
//! The UI never sees the provider tokens. A proxy in front of the backend reads
//! the session cookie and adds the token to the forwarded request instead.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::session::TokenData;

/// Routes served by the gateway itself that work without a session
const PUBLIC_ROUTES: &[&str] = &["/login", "/login/token", "/authproviders", "/ping"];

/// Add `Authorization: Bearer <token>` for the session's auth token.
///
/// An `Authorization` header already on the request wins, and an empty session
/// adds nothing. Returns whether the header was added.
pub fn attach_bearer(headers: &mut HeaderMap, token: &TokenData) -> bool {
    if headers.contains_key(AUTHORIZATION) || token.is_empty() {
        return false;
    }

    match HeaderValue::from_str(&format!("Bearer {}", token.auth_token())) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
            true
        }
        Err(_) => {
            log::warn!(
                "Session token contains characters not allowed in a header, not forwarding it"
            );
            false
        }
    }
}

/// Whether a request path needs a session to be forwarded
#[must_use]
pub fn requires_auth(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or_default();
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    !PUBLIC_ROUTES.contains(&path)
}
