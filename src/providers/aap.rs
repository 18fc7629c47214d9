//! Ansible Automation Platform gateway provider

use async_trait::async_trait;
use serde::Deserialize;

use super::{required, required_client_id, AuthProvider, OAuthClient, ProviderContext};
use crate::error::{GatewayError, ProtocolError, UpstreamError};
use crate::models::LoginParameters;
use crate::oauth::{fetch_userinfo, PkceChallenge, TokenExchange};
use crate::registry::ProviderSpec;
use crate::session::TokenData;

const SCOPE: &str = "read";

#[derive(Debug, Deserialize)]
struct AapUser {
    #[serde(default)]
    username: String,
}

/// The gateway's `/me/` endpoint wraps the user in a result page
#[derive(Debug, Deserialize)]
struct AapUserInfo {
    #[serde(default)]
    results: Vec<AapUser>,
}

#[derive(Debug, Clone)]
pub struct AapProvider {
    oauth: OAuthClient,
    /// Public gateway URL, used for the browser redirect and forwarded headers
    auth_url: String,
    /// Gateway URL for server-to-server calls; the public one unless an internal URL is set
    internal_auth_url: String,
    http: reqwest::Client,
}

impl AapProvider {
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when `authUrl` or the client id is missing
    pub fn new(spec: &ProviderSpec, context: &ProviderContext) -> Result<Self, GatewayError> {
        let auth_url = required(spec.auth_url(), spec, "authUrl")?.trim_end_matches('/');
        required_client_id(spec)?;
        let internal_auth_url = spec
            .internal_url()
            .map_or(auth_url, |u| u.trim_end_matches('/'));

        // the gateway answers token requests with 201 Created
        let oauth = OAuthClient::new(
            spec,
            context,
            &format!("{auth_url}/o/authorize/"),
            &format!("{internal_auth_url}/o/token/"),
            Some(SCOPE.to_string()),
        )
        .rewrite_created_status();

        Ok(Self {
            oauth,
            auth_url: auth_url.to_string(),
            internal_auth_url: internal_auth_url.to_string(),
            http: context.http.clone(),
        })
    }

    fn userinfo_url(&self) -> String {
        format!("{}/api/gateway/v1/me/", self.internal_auth_url)
    }

    fn revoke_url(&self) -> String {
        format!("{}/o/revoke_token/", self.internal_auth_url)
    }
}

#[async_trait]
impl AuthProvider for AapProvider {
    fn name(&self) -> &str {
        self.oauth.provider()
    }

    async fn get_token(&self, params: &LoginParameters) -> Result<TokenExchange, GatewayError> {
        self.oauth.exchange_code(params).await
    }

    async fn get_user_info(&self, token: &TokenData) -> Result<String, GatewayError> {
        if token.access_token.is_empty() {
            return Err(GatewayError::Token(
                "access token is required for AAP userinfo".to_string(),
            ));
        }

        let body = fetch_userinfo(
            &self.http,
            &self.userinfo_url(),
            &token.access_token,
            Some(&self.auth_url),
        )
        .await?;
        let userinfo: AapUserInfo = serde_json::from_value(body).map_err(|e| {
            ProtocolError::MalformedResponse(format!("unexpected AAP user response: {e}"))
        })?;

        match userinfo.results.into_iter().next() {
            Some(user) => Ok(user.username),
            None => {
                log::warn!("AAP gateway returned no user for provider '{}'", self.name());
                Err(ProtocolError::MalformedResponse("no user available".to_string()).into())
            }
        }
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenExchange, GatewayError> {
        self.oauth.refresh(refresh_token).await
    }

    /// Revoke the access token at the gateway. There is no browser redirect.
    async fn logout(&self, token: &TokenData) -> Result<Option<String>, GatewayError> {
        let form = [
            ("client_id", self.oauth.client_id()),
            ("token", token.auth_token()),
        ];
        let response = self
            .http
            .post(self.revoke_url())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()).into());
        }
        log::info!("Revoked AAP token for provider '{}'", self.name());
        Ok(None)
    }

    fn login_redirect_url(&self, pkce: &PkceChallenge) -> Result<String, GatewayError> {
        self.oauth.redirect_url(pkce)
    }
}
