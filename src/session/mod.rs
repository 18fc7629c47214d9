//! Session handling
//!
//! The gateway keeps no server-side session state. Everything a later request
//! needs (the provider-issued tokens and the name of the provider that issued
//! them) travels in one cookie, see [`codec`] for the wire format and
//! [`cookie`] for how cookies are built, read and cleared.

pub mod codec;
pub mod cookie;

pub use codec::{decode_token_data, encode_token_data};
pub use cookie::{CookieOptions, SessionCookies, PKCE_COOKIE_TTL_MINUTES};

use serde::{Deserialize, Serialize};

/// Credentials stored in the session cookie
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenData {
    pub id_token: String,
    pub access_token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub refresh_token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub provider: String,
}

impl TokenData {
    /// The token used to authenticate against the backend API: the ID token
    /// when present, otherwise the access token.
    #[must_use]
    pub fn auth_token(&self) -> &str {
        if self.id_token.is_empty() {
            &self.access_token
        } else {
            &self.id_token
        }
    }

    /// `true` when neither token is set, i.e. the caller is not logged in.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_token.is_empty() && self.access_token.is_empty()
    }

    #[must_use]
    pub fn with_provider(mut self, provider: &str) -> Self {
        provider.clone_into(&mut self.provider);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_token_prefers_id_token() {
        let token = TokenData {
            id_token: "id".into(),
            access_token: "access".into(),
            ..Default::default()
        };
        assert_eq!(token.auth_token(), "id");

        let token = TokenData {
            access_token: "access".into(),
            ..Default::default()
        };
        assert_eq!(token.auth_token(), "access");
        assert!(!token.is_empty());
        assert!(TokenData::default().is_empty());
    }

    #[test]
    fn test_optional_fields_omitted() {
        let token = TokenData {
            id_token: "IT".into(),
            access_token: "AT".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json, serde_json::json!({"idToken": "IT", "accessToken": "AT"}));
    }
}
