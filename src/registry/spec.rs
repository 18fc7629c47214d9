//! Provider configuration as served by the config source

use serde::{Deserialize, Serialize};

use crate::claims::parse_claim_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    K8s,
    #[serde(alias = "OIDC")]
    Oidc,
    #[serde(alias = "OAuth2")]
    OAuth2,
    #[serde(alias = "AAPGateway")]
    Aap,
    #[serde(alias = "OpenShift")]
    OpenShift,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::K8s => "k8s",
            Self::Oidc => "oidc",
            Self::OAuth2 => "oauth2",
            Self::Aap => "aap",
            Self::OpenShift => "openshift",
        };
        f.write_str(name)
    }
}

/// A list of scopes, written either as a JSON list or a space-separated string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scopes {
    List(Vec<String>),
    Joined(String),
}

impl Scopes {
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::List(list) => list
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Self::Joined(joined) => joined.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// A claim path, written either as a list of segments or a `|`-separated string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimPathSpec {
    Segments(Vec<String>),
    Joined(String),
}

impl ClaimPathSpec {
    /// Validated path segments
    ///
    /// # Errors
    ///
    /// Returns an error if the path or any of its segments is empty
    pub fn segments(&self) -> Result<Vec<String>, String> {
        match self {
            Self::Joined(raw) => parse_claim_path(raw),
            Self::Segments(segments) => {
                if segments.is_empty() {
                    return Err("claim path is empty".to_string());
                }
                segments
                    .iter()
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
        }
    }

    /// Human-readable form used in validation reports
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Joined(raw) => raw.clone(),
            Self::Segments(segments) => segments.join("|"),
        }
    }
}

/// Organization assignment policy attached to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationAssignment {
    /// `Static`, `Dynamic` or `PerUser`
    #[serde(rename = "type")]
    pub assignment_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_path: Option<ClaimPathSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name_suffix: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Configuration for one authentication provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "type", alias = "providerType")]
    pub provider_type: ProviderType,
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Environment variable overriding `client_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id_env: Option<String>,
    /// Environment variable overriding `client_secret`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(
        default,
        alias = "userinfoUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_info_url: Option<String>,
    /// Cluster-local base URL used instead of the public one for server-to-server calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Public API URL of an OpenShift cluster; see [`ProviderSpec::is_openshift_oauth`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Scopes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_claim: Option<ClaimPathSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_assignment: Option<OrganizationAssignment>,
}

/// Document returned by the config source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default)]
    pub providers: Vec<ProviderSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
    #[serde(default)]
    pub organizations_enabled: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ProviderSpec> {
        self.providers.iter().find(|p| p.name == name)
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

impl ProviderSpec {
    /// Create a minimal spec; mostly useful for building specs in code
    #[must_use]
    pub fn new(name: &str, provider_type: ProviderType) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            provider_type,
            enabled: true,
            client_id: String::new(),
            client_secret: None,
            client_id_env: None,
            client_secret_env: None,
            issuer: None,
            auth_url: None,
            authorization_url: None,
            token_url: None,
            user_info_url: None,
            internal_url: None,
            api_url: None,
            external_api_url: None,
            scopes: None,
            username_claim: None,
            organization_assignment: None,
        }
    }

    /// Client id, checking the override environment variable first
    #[must_use]
    pub fn get_client_id(&self) -> String {
        if let Some(env_var) = &self.client_id_env {
            if let Ok(value) = std::env::var(env_var) {
                return value;
            }
        }
        self.client_id.trim().to_string()
    }

    /// Client secret, checking the override environment variable first.
    /// An empty secret is reported as `None`.
    #[must_use]
    pub fn get_client_secret(&self) -> Option<String> {
        if let Some(env_var) = &self.client_secret_env {
            if let Ok(value) = std::env::var(env_var) {
                return Some(value).filter(|s| !s.is_empty());
            }
        }
        self.client_secret.clone().filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        non_empty(self.issuer.as_ref())
    }

    #[must_use]
    pub fn auth_url(&self) -> Option<&str> {
        non_empty(self.auth_url.as_ref())
    }

    #[must_use]
    pub fn authorization_url(&self) -> Option<&str> {
        non_empty(self.authorization_url.as_ref())
    }

    #[must_use]
    pub fn token_url(&self) -> Option<&str> {
        non_empty(self.token_url.as_ref())
    }

    #[must_use]
    pub fn user_info_url(&self) -> Option<&str> {
        non_empty(self.user_info_url.as_ref())
    }

    #[must_use]
    pub fn internal_url(&self) -> Option<&str> {
        non_empty(self.internal_url.as_ref())
    }

    #[must_use]
    pub fn scope_list(&self) -> Vec<String> {
        self.scopes.as_ref().map(Scopes::to_vec).unwrap_or_default()
    }

    /// Scopes joined for the `scope` request parameter, `None` when unset
    #[must_use]
    pub fn scope_param(&self) -> Option<String> {
        let scopes = self.scope_list();
        if scopes.is_empty() {
            None
        } else {
            Some(scopes.join(" "))
        }
    }

    /// Parsed username claim path, `None` when not configured
    ///
    /// # Errors
    ///
    /// Returns an error if the configured path is malformed
    pub fn username_claim_path(&self) -> Result<Option<Vec<String>>, String> {
        self.username_claim
            .as_ref()
            .map(ClaimPathSpec::segments)
            .transpose()
    }

    /// Whether a `k8s` spec actually describes OpenShift OAuth: it declares an
    /// external API URL that differs from its base API URL.
    #[must_use]
    pub fn is_openshift_oauth(&self) -> bool {
        match (
            non_empty(self.external_api_url.as_ref()),
            non_empty(self.api_url.as_ref()),
        ) {
            (Some(external), Some(api)) => {
                api.trim_end_matches('/') != external.trim_end_matches('/')
            }
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}
