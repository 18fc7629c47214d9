use serde::{Deserialize, Serialize};

use crate::registry::{ProviderSpec, ProviderType};

/// Body of `POST /login`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginParameters {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
    /// The `state` the IdP echoed back, used to recover the provider and verifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl LoginParameters {
    #[must_use]
    pub fn new(code: &str, code_verifier: &str) -> Self {
        Self {
            code: code.to_string(),
            code_verifier: Some(code_verifier.to_string()).filter(|v| !v.is_empty()),
            state: None,
        }
    }

    /// The verifier to send, empty when none was supplied
    #[must_use]
    pub fn verifier(&self) -> &str {
        self.code_verifier.as_deref().unwrap_or_default()
    }
}

/// Body of `POST /login/token`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenLoginParameters {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub provider: String,
}

/// `?provider=<name>` on the login routes
#[derive(Debug, Default, Deserialize)]
pub struct ProviderQuery {
    pub provider: Option<String>,
}

/// Response of the login and refresh endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiresInResponse {
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub username: String,
}

/// Response carrying a URL the browser should visit next
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Public view of a provider, safe to hand to the login page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    pub is_default: bool,
}

impl ProviderSummary {
    #[must_use]
    pub fn from_spec(spec: &ProviderSpec, is_default: bool) -> Self {
        Self {
            name: spec.name.clone(),
            display_name: spec
                .display_name
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| spec.name.clone()),
            provider_type: spec.provider_type,
            is_default,
        }
    }
}
