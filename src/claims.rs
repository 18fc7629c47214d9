//! Claim extraction from userinfo documents and JWT payloads
//!
//! Providers disagree on where the human-readable username lives. This module
//! walks nested claim paths, stringifies whatever it finds, and applies a fixed
//! fallback order when the configured claim is missing.
//!
//! JWTs handled here are decoded **without** signature verification. They are
//! only ever read after the backend API or the IdP has accepted them.

use base64::{engine::general_purpose, Engine as _};
use serde_json::{Map, Value};

/// Separator for claim paths written as a single string (`"realm|user|name"`)
pub const CLAIM_PATH_SEPARATOR: char = '|';

/// Identity reported when no username claim can be resolved
pub const ANONYMOUS_USERNAME: &str = "Anonymous";

/// Standard claims tried, in order, after the configured claim path
pub const FALLBACK_USERNAME_CLAIMS: [&str; 5] =
    ["preferred_username", "email", "sub", "name", "username"];

const SERVICE_ACCOUNT_FLAT_CLAIM: &str = "kubernetes.io/serviceaccount/service-account.name";
const SERVICE_ACCOUNT_NESTED_PATH: [&str; 3] = ["kubernetes.io", "serviceaccount", "name"];

/// JSON object holding a decoded set of claims
pub type Claims = Map<String, Value>;

/// Look up a value by walking `path` through nested JSON objects.
///
/// Returns `None` when a segment is missing or when a non-object is reached
/// before the last segment. An empty path never matches.
#[must_use]
pub fn value_at_path<'a, S: AsRef<str>>(data: &'a Value, path: &[S]) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = data;
    for segment in path {
        current = current.as_object()?.get(segment.as_ref())?;
    }
    Some(current)
}

/// Split a `|`-separated claim path into its segments.
///
/// # Errors
///
/// Returns an error naming the offending position when a segment is empty
/// after trimming.
pub fn parse_claim_path(raw: &str) -> Result<Vec<String>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("claim path is empty".to_string());
    }

    raw.split(CLAIM_PATH_SEPARATOR)
        .enumerate()
        .map(|(idx, segment)| {
            let segment = segment.trim();
            if segment.is_empty() {
                Err(format!("claim path segment {} is empty", idx + 1))
            } else {
                Ok(segment.to_string())
            }
        })
        .collect()
}

/// Render a claim value as a username candidate.
///
/// Whole numbers lose their fractional part, booleans render as `true`/`false`,
/// arrays and objects render as JSON. Empty strings and `null` yield `None`.
#[must_use]
pub fn claim_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.as_i64().map_or_else(
            || {
                n.as_f64()
                    .map_or_else(|| n.to_string(), |f| format!("{f:.0}"))
            },
            |i| i.to_string(),
        )),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Resolve a username from a userinfo document.
///
/// The configured path is tried first, then [`FALLBACK_USERNAME_CLAIMS`] in order.
#[must_use]
pub fn resolve_username<S: AsRef<str>>(userinfo: &Value, configured_path: &[S]) -> Option<String> {
    if let Some(username) = value_at_path(userinfo, configured_path).and_then(claim_as_string) {
        return Some(username);
    }

    FALLBACK_USERNAME_CLAIMS.iter().find_map(|claim| {
        let username = value_at_path(userinfo, &[*claim]).and_then(claim_as_string)?;
        log::info!("Using '{claim}' claim as username fallback");
        Some(username)
    })
}

/// Decode the payload of a JWT without verifying its signature.
///
/// # Errors
///
/// Returns an error if the token does not have exactly three segments, if the
/// payload is not base64url, or if it is not a JSON object.
pub fn decode_jwt_claims(token: &str) -> Result<Claims, String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid JWT format".to_string());
    }

    let payload = parts[1].trim_end_matches('=');
    let decoded = general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| format!("Failed to decode JWT payload: {e}"))?;

    match serde_json::from_slice::<Value>(&decoded) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err("JWT payload is not a JSON object".to_string()),
        Err(e) => Err(format!("Failed to parse JWT payload: {e}")),
    }
}

/// Seconds until the `exp` claim, clamped at zero.
///
/// `exp` may be an integer or a float Unix timestamp. Returns `None` when the
/// claim is absent or not numeric.
#[must_use]
pub fn seconds_until_expiry(claims: &Claims, now: i64) -> Option<i64> {
    let exp = claims.get("exp")?;
    #[allow(clippy::cast_possible_truncation)]
    let exp = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
    Some((exp - now).max(0))
}

/// Seconds until a JWT expires, measured from the current wall clock.
#[must_use]
pub fn token_expires_in(token: &str) -> Option<i64> {
    let claims = decode_jwt_claims(token).ok()?;
    seconds_until_expiry(&claims, chrono::Utc::now().timestamp())
}

/// Username of a Kubernetes service-account token.
///
/// Precedence: nested `kubernetes.io.serviceaccount.name`, the legacy flat
/// claim, the last segment of a `system:serviceaccount:<ns>:<name>` subject,
/// then the raw subject.
#[must_use]
pub fn service_account_username(claims: &Claims) -> Option<String> {
    let claims = Value::Object(claims.clone());

    if let Some(name) = value_at_path(&claims, &SERVICE_ACCOUNT_NESTED_PATH)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        return Some(name.to_string());
    }

    if let Some(name) = value_at_path(&claims, &[SERVICE_ACCOUNT_FLAT_CLAIM])
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        return Some(name.to_string());
    }

    let sub = value_at_path(&claims, &["sub"])
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())?;

    let parts: Vec<&str> = sub.split(':').collect();
    if let ["system", "serviceaccount", _, name] = parts.as_slice() {
        return Some((*name).to_string());
    }
    Some(sub.to_string())
}

/// Decode a JWT and resolve its service-account username.
///
/// # Errors
///
/// Returns an error if the token cannot be decoded or carries no usable claim.
pub fn username_from_token(token: &str) -> Result<String, String> {
    let claims = decode_jwt_claims(token)?;
    service_account_username(&claims)
        .ok_or_else(|| "Could not extract username from token claims".to_string())
}
