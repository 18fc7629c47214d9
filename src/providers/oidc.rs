//! OpenID Connect provider
//!
//! Endpoints come from the discovery document. When the issuer is reached
//! over an internal URL, browser-facing endpoints are rewritten to the public
//! issuer while token and userinfo calls keep the discovered internal URLs.

use async_trait::async_trait;
use url::Url;

use super::{
    claim_path_or, required, required_client_id, username_or_anonymous, AuthProvider, OAuthClient,
    ProviderContext,
};
use crate::error::{GatewayError, ProtocolError};
use crate::models::LoginParameters;
use crate::oauth::{
    fetch_discovery_document, fetch_userinfo, OidcEndpoints, PkceChallenge, TokenExchange,
};
use crate::registry::ProviderSpec;
use crate::session::TokenData;

pub const DEFAULT_SCOPE: &str = "openid profile";
/// Default scope of the built-in provider when organizations are enabled
pub const DEFAULT_ORGANIZATION_SCOPE: &str = "openid profile organization:*";

#[derive(Debug, Clone)]
pub struct OidcProvider {
    oauth: OAuthClient,
    issuer: String,
    endpoints: OidcEndpoints,
    username_claim: Vec<String>,
    http: reqwest::Client,
    post_logout_redirect_uri: String,
}

impl OidcProvider {
    /// Fetch discovery and build the provider
    ///
    /// `default_scope` is used when the spec lists no scopes.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec lacks an issuer or client id, or the
    /// discovery document cannot be fetched or lacks required endpoints
    pub async fn discover(
        spec: &ProviderSpec,
        context: &ProviderContext,
        default_scope: &str,
    ) -> Result<Self, GatewayError> {
        let issuer = required(spec.issuer(), spec, "issuer")?.trim_end_matches('/');
        required_client_id(spec)?;

        let internal = spec.internal_url().map(|u| u.trim_end_matches('/'));
        let discovery_base = internal.unwrap_or(issuer);
        let document = fetch_discovery_document(&context.http, discovery_base).await?;
        let endpoints = OidcEndpoints::resolve(&document, internal, issuer)?;

        log::debug!(
            "Discovered endpoints for '{}': authorization={}, token={}, \
             userinfo={:?}, end_session={:?}",
            spec.name,
            endpoints.authorization,
            endpoints.token,
            endpoints.userinfo,
            endpoints.end_session
        );

        Self::from_endpoints(spec, context, issuer, endpoints, default_scope)
    }

    /// Build the provider from already resolved endpoints
    ///
    /// # Errors
    ///
    /// Returns an error if the configured username claim is malformed
    pub fn from_endpoints(
        spec: &ProviderSpec,
        context: &ProviderContext,
        issuer: &str,
        endpoints: OidcEndpoints,
        default_scope: &str,
    ) -> Result<Self, GatewayError> {
        let scope = spec.scope_param().unwrap_or_else(|| default_scope.to_string());
        let oauth = OAuthClient::new(
            spec,
            context,
            &endpoints.authorization,
            &endpoints.token,
            Some(scope),
        );

        Ok(Self {
            oauth,
            issuer: issuer.to_string(),
            endpoints,
            // an empty path leaves the standard fallback order in charge
            username_claim: claim_path_or(spec, &[])?,
            http: context.http.clone(),
            post_logout_redirect_uri: context.base_ui_url.clone(),
        })
    }

    #[must_use]
    pub fn endpoints(&self) -> &OidcEndpoints {
        &self.endpoints
    }
}

#[async_trait]
impl AuthProvider for OidcProvider {
    fn name(&self) -> &str {
        self.oauth.provider()
    }

    async fn get_token(&self, params: &LoginParameters) -> Result<TokenExchange, GatewayError> {
        self.oauth.exchange_code(params).await
    }

    async fn get_user_info(&self, token: &TokenData) -> Result<String, GatewayError> {
        if token.access_token.is_empty() {
            return Err(GatewayError::Token(
                "access token is required for OIDC userinfo".to_string(),
            ));
        }
        let endpoint = self.endpoints.userinfo.as_deref().ok_or_else(|| {
            ProtocolError::Discovery(format!(
                "provider '{}' has no userinfo_endpoint",
                self.name()
            ))
        })?;

        let userinfo =
            fetch_userinfo(&self.http, endpoint, &token.access_token, Some(&self.issuer)).await?;
        Ok(username_or_anonymous(
            self.name(),
            &userinfo,
            &self.username_claim,
        ))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenExchange, GatewayError> {
        self.oauth.refresh(refresh_token).await
    }

    async fn logout(&self, _token: &TokenData) -> Result<Option<String>, GatewayError> {
        let Some(end_session) = &self.endpoints.end_session else {
            log::debug!(
                "No end_session_endpoint for '{}', performing local logout only",
                self.name()
            );
            return Ok(None);
        };

        let mut url = Url::parse(end_session).map_err(|e| {
            ProtocolError::Discovery(format!("invalid end_session_endpoint: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("post_logout_redirect_uri", &self.post_logout_redirect_uri)
            .append_pair("client_id", self.oauth.client_id());
        Ok(Some(url.to_string()))
    }

    fn login_redirect_url(&self, pkce: &PkceChallenge) -> Result<String, GatewayError> {
        self.oauth.redirect_url(pkce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProviderType;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context() -> ProviderContext {
        ProviderContext {
            http: reqwest::Client::new(),
            api_url: "http://api".into(),
            base_ui_url: "https://ui.example.com".into(),
            pkce_state_fallback: false,
        }
    }

    fn spec(issuer: &str) -> ProviderSpec {
        let mut spec = ProviderSpec::new("sso", ProviderType::Oidc);
        spec.client_id = "ui".into();
        spec.issuer = Some(issuer.to_string());
        spec
    }

    async fn mount_discovery(server: &MockServer, base: &str, end_session: bool) {
        let mut doc = json!({
            "issuer": base,
            "authorization_endpoint": format!("{base}/auth"),
            "token_endpoint": format!("{base}/token"),
            "userinfo_endpoint": format!("{base}/userinfo"),
        });
        if end_session {
            doc["end_session_endpoint"] = json!(format!("{base}/logout"));
        }
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(doc))
            .mount(server)
            .await;
    }

    #[actix_web::test]
    async fn test_discover_rewrites_browser_endpoints() {
        let server = MockServer::start().await;
        mount_discovery(&server, &server.uri(), true).await;

        let mut spec = spec("https://sso.example.com");
        spec.internal_url = Some(server.uri());
        let provider = OidcProvider::discover(&spec, &context(), DEFAULT_SCOPE)
            .await
            .unwrap();

        assert_eq!(provider.endpoints().authorization, "https://sso.example.com/auth");
        assert_eq!(provider.endpoints().token, format!("{}/token", server.uri()));

        let logout = provider.logout(&TokenData::default()).await.unwrap().unwrap();
        assert!(logout.starts_with("https://sso.example.com/logout?"));
        assert!(logout.contains("post_logout_redirect_uri=https%3A%2F%2Fui.example.com"));
        assert!(logout.contains("client_id=ui"));
    }

    #[actix_web::test]
    async fn test_logout_without_end_session() {
        let server = MockServer::start().await;
        mount_discovery(&server, &server.uri(), false).await;
        let provider = OidcProvider::discover(&spec(&server.uri()), &context(), DEFAULT_SCOPE)
            .await
            .unwrap();
        assert_eq!(provider.logout(&TokenData::default()).await.unwrap(), None);
    }

    #[actix_web::test]
    async fn test_user_info_falls_back_to_email() {
        let server = MockServer::start().await;
        mount_discovery(&server, &server.uri(), false).await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer AT"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"email": "jane@example.com"})),
            )
            .mount(&server)
            .await;

        let mut spec = spec(&server.uri());
        spec.username_claim = Some(crate::registry::ClaimPathSpec::Joined("login".into()));
        let provider = OidcProvider::discover(&spec, &context(), DEFAULT_SCOPE)
            .await
            .unwrap();

        let token = TokenData {
            access_token: "AT".into(),
            ..TokenData::default()
        };
        assert_eq!(provider.get_user_info(&token).await.unwrap(), "jane@example.com");
    }

    #[actix_web::test]
    async fn test_user_info_anonymous_and_missing_token() {
        let server = MockServer::start().await;
        mount_discovery(&server, &server.uri(), false).await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"groups": []})))
            .mount(&server)
            .await;

        let provider = OidcProvider::discover(&spec(&server.uri()), &context(), DEFAULT_SCOPE)
            .await
            .unwrap();
        let token = TokenData {
            access_token: "AT".into(),
            ..TokenData::default()
        };
        assert_eq!(provider.get_user_info(&token).await.unwrap(), "Anonymous");
        assert!(matches!(
            provider.get_user_info(&TokenData::default()).await,
            Err(GatewayError::Token(_))
        ));
    }

    #[actix_web::test]
    async fn test_discover_requires_issuer_and_client() {
        let mut no_issuer = spec("");
        no_issuer.issuer = None;
        assert!(OidcProvider::discover(&no_issuer, &context(), DEFAULT_SCOPE)
            .await
            .is_err());

        let mut no_client = spec("https://sso");
        no_client.client_id = String::new();
        assert!(OidcProvider::discover(&no_client, &context(), DEFAULT_SCOPE)
            .await
            .is_err());
    }

    #[test]
    fn test_default_scope_applied() {
        let endpoints = OidcEndpoints {
            authorization: "https://sso/auth".into(),
            token: "https://sso/token".into(),
            userinfo: None,
            end_session: None,
        };
        let provider = OidcProvider::from_endpoints(
            &spec("https://sso"),
            &context(),
            "https://sso",
            endpoints,
            DEFAULT_ORGANIZATION_SCOPE,
        )
        .unwrap();
        let url = provider.login_redirect_url(&PkceChallenge::generate()).unwrap();
        assert!(url.contains("scope=openid+profile+organization%3A*"));
    }
}
