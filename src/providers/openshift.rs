//! OpenShift OAuth server provider
//!
//! OpenShift issues JWTs, so the username is read from the token itself and
//! no userinfo endpoint is involved.

use async_trait::async_trait;
use url::Url;

use super::{required, required_client_id, AuthProvider, OAuthClient, ProviderContext};
use crate::claims::username_from_token;
use crate::error::GatewayError;
use crate::models::LoginParameters;
use crate::oauth::{fetch_oauth_server_metadata, PkceChallenge, TokenExchange};
use crate::registry::ProviderSpec;
use crate::session::TokenData;

pub const DEFAULT_SCOPE: &str = "user:full";

#[derive(Debug, Clone)]
pub struct OpenShiftProvider {
    oauth: OAuthClient,
    /// Base the OAuth server metadata is looked up under at logout
    api_server_url: String,
    http: reqwest::Client,
}

impl OpenShiftProvider {
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when `authUrl`, `tokenUrl` or the client
    /// id is missing
    pub fn new(spec: &ProviderSpec, context: &ProviderContext) -> Result<Self, GatewayError> {
        let auth_url = required(spec.auth_url(), spec, "authUrl")?;
        let token_url = required(spec.token_url(), spec, "tokenUrl")?;
        required_client_id(spec)?;

        let scope = spec
            .scope_param()
            .unwrap_or_else(|| DEFAULT_SCOPE.to_string());

        Ok(Self {
            oauth: OAuthClient::new(spec, context, auth_url, token_url, Some(scope)),
            api_server_url: auth_url.trim_end_matches('/').to_string(),
            http: context.http.clone(),
        })
    }

    /// `{issuer}/logout` from the OAuth server metadata, `None` on any failure
    async fn discover_logout_url(&self) -> Option<String> {
        let metadata = match fetch_oauth_server_metadata(&self.http, &self.api_server_url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                log::debug!("OAuth server metadata unavailable for logout: {e}");
                return None;
            }
        };

        let issuer = metadata.issuer.filter(|i| !i.is_empty())?;
        let mut url = Url::parse(&issuer).ok()?;
        url.set_path("/logout");
        Some(url.to_string())
    }
}

#[async_trait]
impl AuthProvider for OpenShiftProvider {
    fn name(&self) -> &str {
        self.oauth.provider()
    }

    async fn get_token(&self, params: &LoginParameters) -> Result<TokenExchange, GatewayError> {
        self.oauth.exchange_code(params).await
    }

    async fn get_user_info(&self, token: &TokenData) -> Result<String, GatewayError> {
        let jwt = token.auth_token();
        if jwt.is_empty() {
            return Err(GatewayError::Token(
                "token is required for OpenShift userinfo".to_string(),
            ));
        }
        username_from_token(jwt).map_err(|e| {
            log::warn!(
                "Failed to extract username from OpenShift token for provider '{}': {e}",
                self.name()
            );
            GatewayError::Token(e)
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenExchange, GatewayError> {
        self.oauth.refresh(refresh_token).await
    }

    async fn logout(&self, _token: &TokenData) -> Result<Option<String>, GatewayError> {
        Ok(self.discover_logout_url().await)
    }

    fn login_redirect_url(&self, pkce: &PkceChallenge) -> Result<String, GatewayError> {
        self.oauth.redirect_url(pkce)
    }
}
