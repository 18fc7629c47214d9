//! Generic OAuth2 provider (GitHub, GitLab and other non-OIDC IdPs)

use async_trait::async_trait;

use super::{
    claim_path_or, required, required_client_id, username_or_anonymous, AuthProvider, OAuthClient,
    ProviderContext,
};
use crate::error::{ConfigError, GatewayError};
use crate::models::LoginParameters;
use crate::oauth::{fetch_userinfo, PkceChallenge, TokenExchange};
use crate::registry::ProviderSpec;
use crate::session::TokenData;
use crate::utils::secrets::mask_secret;

const DEFAULT_USERNAME_CLAIM: &str = "email";

#[derive(Debug, Clone)]
pub struct OAuth2Provider {
    oauth: OAuthClient,
    userinfo_url: String,
    username_claim: Vec<String>,
    http: reqwest::Client,
}

impl OAuth2Provider {
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when any of the authorization, token or
    /// userinfo URLs, the scopes or the client id are missing
    pub fn new(spec: &ProviderSpec, context: &ProviderContext) -> Result<Self, GatewayError> {
        let authorization_url = required(spec.authorization_url(), spec, "authorizationUrl")?;
        let token_url = required(spec.token_url(), spec, "tokenUrl")?;
        let userinfo_url = required(spec.user_info_url(), spec, "userInfoUrl")?;
        let scope = spec.scope_param().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "oauth2 provider '{}' requires scopes to be configured",
                spec.name
            ))
        })?;
        required_client_id(spec)?;

        log::info!(
            "OAuth2 client for '{}': client_id={}, client_secret={}, token_url={}, scopes={scope}",
            spec.name,
            mask_secret(&spec.get_client_id()),
            mask_secret(&spec.get_client_secret().unwrap_or_default()),
            token_url
        );

        Ok(Self {
            oauth: OAuthClient::new(spec, context, authorization_url, token_url, Some(scope)),
            userinfo_url: userinfo_url.to_string(),
            username_claim: claim_path_or(spec, &[DEFAULT_USERNAME_CLAIM])?,
            http: context.http.clone(),
        })
    }
}

#[async_trait]
impl AuthProvider for OAuth2Provider {
    fn name(&self) -> &str {
        self.oauth.provider()
    }

    async fn get_token(&self, params: &LoginParameters) -> Result<TokenExchange, GatewayError> {
        self.oauth.exchange_code(params).await
    }

    async fn get_user_info(&self, token: &TokenData) -> Result<String, GatewayError> {
        if token.access_token.is_empty() {
            return Err(GatewayError::Token(
                "access token is required for OAuth2 userinfo".to_string(),
            ));
        }
        let userinfo = fetch_userinfo(
            &self.http,
            &self.userinfo_url,
            &token.access_token,
            Some(self.oauth.authorize_url()),
        )
        .await?;
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
        // plain OAuth2 has no end-session endpoint
        Ok(None)
    }

    fn login_redirect_url(&self, pkce: &PkceChallenge) -> Result<String, GatewayError> {
        self.oauth.redirect_url(pkce)
    }
}
