//! OIDC discovery and internal/external endpoint handling
//!
//! The gateway often reaches an IdP through a cluster-local URL while browsers
//! reach it through a public one. Discovery is fetched over the internal URL;
//! endpoints the browser is sent to are then rewritten to the public host, and
//! server-to-server endpoints are left as discovered.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GatewayError, ProtocolError, UpstreamError};

const OIDC_DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
const OAUTH_SERVER_METADATA_PATH: &str = "/.well-known/oauth-authorization-server";

/// Subset of the OIDC discovery / OAuth server metadata document the gateway uses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    #[serde(default)]
    pub grant_types_supported: Vec<String>,
}

/// `{base}/.well-known/openid-configuration`
#[must_use]
pub fn discovery_url(base: &str) -> String {
    format!("{}{OIDC_DISCOVERY_PATH}", base.trim_end_matches('/'))
}

/// `{base}/.well-known/oauth-authorization-server`
#[must_use]
pub fn oauth_server_metadata_url(base: &str) -> String {
    format!("{}{OAUTH_SERVER_METADATA_PATH}", base.trim_end_matches('/'))
}

/// Fetch and parse the OIDC discovery document below `base`
///
/// # Errors
///
/// Returns an upstream error when the request fails or returns a non-2xx
/// status, and a protocol error when the body is not a discovery document
pub async fn fetch_discovery_document(
    client: &reqwest::Client,
    base: &str,
) -> Result<DiscoveryDocument, GatewayError> {
    fetch_metadata(client, &discovery_url(base)).await
}

/// Fetch the OAuth authorization server metadata below `base` (RFC 8414)
///
/// # Errors
///
/// Same as [`fetch_discovery_document`]
pub async fn fetch_oauth_server_metadata(
    client: &reqwest::Client,
    base: &str,
) -> Result<DiscoveryDocument, GatewayError> {
    fetch_metadata(client, &oauth_server_metadata_url(base)).await
}

async fn fetch_metadata(
    client: &reqwest::Client,
    url: &str,
) -> Result<DiscoveryDocument, GatewayError> {
    log::debug!("Fetching discovery document from {url}");

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        log::warn!("Discovery request to {url} returned {status}");
        return Err(UpstreamError::Status(status.as_u16()).into());
    }

    let body = response
        .text()
        .await
        .map_err(|e| UpstreamError::Body(e.to_string()))?;
    serde_json::from_str(&body)
        .map_err(|e| ProtocolError::Discovery(format!("{url}: {e}")).into())
}

/// Replace the scheme and host of `endpoint` with those of `new_base`, but only
/// when `endpoint` is hosted on `old_base`. Anything unparseable is returned
/// unchanged.
#[must_use]
pub fn rewrite_base_url(endpoint: &str, old_base: &str, new_base: &str) -> String {
    let (Ok(old_url), Ok(new_url), Ok(mut endpoint_url)) =
        (Url::parse(old_base), Url::parse(new_base), Url::parse(endpoint))
    else {
        return endpoint.to_string();
    };

    if endpoint_url.host_str() != old_url.host_str() || endpoint_url.port() != old_url.port() {
        return endpoint.to_string();
    }

    if endpoint_url.set_scheme(new_url.scheme()).is_err()
        || endpoint_url.set_host(new_url.host_str()).is_err()
        || endpoint_url.set_port(new_url.port()).is_err()
    {
        return endpoint.to_string();
    }
    endpoint_url.to_string()
}

/// Endpoints of an OIDC provider, split by who calls them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcEndpoints {
    /// Browser-facing
    pub authorization: String,
    /// Server-to-server
    pub token: String,
    /// Server-to-server
    pub userinfo: Option<String>,
    /// Browser-facing
    pub end_session: Option<String>,
}

impl OidcEndpoints {
    /// Split a discovery document into browser-facing and server-side endpoints.
    ///
    /// `internal_base` is the URL discovery was fetched from, when it differs
    /// from the public `external_base`.
    ///
    /// # Errors
    ///
    /// Returns a protocol error when the document lacks an authorization or
    /// token endpoint
    pub fn resolve(
        doc: &DiscoveryDocument,
        internal_base: Option<&str>,
        external_base: &str,
    ) -> Result<Self, GatewayError> {
        let authorization = non_empty(doc.authorization_endpoint.as_deref()).ok_or_else(|| {
            ProtocolError::Discovery("missing authorization_endpoint".to_string())
        })?;
        let token = non_empty(doc.token_endpoint.as_deref())
            .ok_or_else(|| ProtocolError::Discovery("missing token_endpoint".to_string()))?;

        let to_external = |endpoint: &str| match internal_base {
            Some(internal) if internal != external_base => {
                rewrite_base_url(endpoint, internal, external_base)
            }
            _ => endpoint.to_string(),
        };

        Ok(Self {
            authorization: to_external(authorization),
            token: token.to_string(),
            userinfo: non_empty(doc.userinfo_endpoint.as_deref()).map(str::to_string),
            end_session: non_empty(doc.end_session_endpoint.as_deref()).map(to_external),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_url_trims_slash() {
        assert_eq!(
            discovery_url("https://sso.example.com/realms/main/"),
            "https://sso.example.com/realms/main/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_rewrite_base_url_matching_host() {
        assert_eq!(
            rewrite_base_url(
                "http://keycloak.svc:8080/realms/main/protocol/openid-connect/auth",
                "http://keycloak.svc:8080/realms/main",
                "https://sso.example.com/realms/main",
            ),
            "https://sso.example.com/realms/main/protocol/openid-connect/auth"
        );
    }

    #[test]
    fn test_rewrite_base_url_other_host_untouched() {
        let endpoint = "https://accounts.google.com/o/oauth2/v2/auth";
        assert_eq!(
            rewrite_base_url(endpoint, "http://keycloak.svc:8080", "https://sso.example.com"),
            endpoint
        );
        assert_eq!(rewrite_base_url("not a url", "http://a", "http://b"), "not a url");
    }

    #[test]
    fn test_resolve_splits_endpoints() {
        let doc = DiscoveryDocument {
            authorization_endpoint: Some("http://kc.svc:8080/auth".into()),
            token_endpoint: Some("http://kc.svc:8080/token".into()),
            userinfo_endpoint: Some("http://kc.svc:8080/userinfo".into()),
            end_session_endpoint: Some("http://kc.svc:8080/logout".into()),
            ..Default::default()
        };

        let endpoints =
            OidcEndpoints::resolve(&doc, Some("http://kc.svc:8080"), "https://sso.example.com")
                .unwrap();

        assert_eq!(endpoints.authorization, "https://sso.example.com/auth");
        assert_eq!(endpoints.token, "http://kc.svc:8080/token");
        assert_eq!(endpoints.userinfo.as_deref(), Some("http://kc.svc:8080/userinfo"));
        assert_eq!(
            endpoints.end_session.as_deref(),
            Some("https://sso.example.com/logout")
        );
    }

    #[test]
    fn test_resolve_without_internal_url() {
        let doc = DiscoveryDocument {
            authorization_endpoint: Some("https://sso/auth".into()),
            token_endpoint: Some("https://sso/token".into()),
            ..Default::default()
        };
        let endpoints = OidcEndpoints::resolve(&doc, None, "https://sso").unwrap();
        assert_eq!(endpoints.authorization, "https://sso/auth");
        assert_eq!(endpoints.userinfo, None);
        assert_eq!(endpoints.end_session, None);
    }

    #[test]
    fn test_resolve_requires_token_endpoint() {
        let doc = DiscoveryDocument {
            authorization_endpoint: Some("https://sso/auth".into()),
            ..Default::default()
        };
        assert!(matches!(
            OidcEndpoints::resolve(&doc, None, "https://sso"),
            Err(GatewayError::Protocol(ProtocolError::Discovery(_)))
        ));
    }
}
