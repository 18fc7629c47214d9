//! Kubernetes bearer-token provider
//!
//! There is no OAuth flow: the user pastes a service-account token, the
//! backend API is asked whether it accepts it, and the token itself becomes
//! the session. Usernames come from the token's claims.

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use super::AuthProvider;
use crate::claims::{token_expires_in, username_from_token};
use crate::error::{GatewayError, UpstreamError};
use crate::models::LoginParameters;
use crate::oauth::{PkceChallenge, TokenExchange};
use crate::session::TokenData;
use crate::utils::bearer::attach_bearer;

/// Cheap authenticated backend call used to check a token
const VALIDATION_PATH: &str = "/api/v1/fleets?limit=1";

#[derive(Debug, Clone)]
pub struct K8sProvider {
    name: String,
    http: reqwest::Client,
    api_url: String,
}

impl K8sProvider {
    #[must_use]
    pub fn new(name: &str, http: reqwest::Client, api_url: &str) -> Self {
        Self {
            name: name.to_string(),
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Check a bearer token against the backend API
    ///
    /// # Errors
    ///
    /// - `GatewayError::Token` when the backend answers 401 or 403
    /// - `UpstreamError` when the backend is unreachable or answers 5xx
    pub async fn validate_token(&self, token: &str) -> Result<TokenExchange, GatewayError> {
        let session = TokenData {
            id_token: token.to_string(),
            ..TokenData::default()
        };
        let mut headers = HeaderMap::new();
        if !attach_bearer(&mut headers, &session) {
            return Err(GatewayError::Token("invalid token".to_string()));
        }

        let url = format!("{}{VALIDATION_PATH}", self.api_url);
        let response = self.http.get(&url).headers(headers).send().await?;

        let status = response.status().as_u16();
        let expires_in = token_expires_in(token);

        if status == 401 || status == 403 {
            if expires_in == Some(0) {
                return Err(GatewayError::Token("token has expired".to_string()));
            }
            return Err(GatewayError::Token("invalid token".to_string()));
        }

        // Non-auth 4xx still proves the token was accepted
        if !(200..500).contains(&status) {
            return Err(UpstreamError::Status(status).into());
        }

        log::info!("Validated bearer token for provider '{}'", self.name);
        Ok(TokenExchange {
            token: session,
            expires_in,
        })
    }
}

#[async_trait]
impl AuthProvider for K8sProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_token(&self, _params: &LoginParameters) -> Result<TokenExchange, GatewayError> {
        Err(GatewayError::UnsupportedOperation(
            "token auth does not use the OAuth code flow".to_string(),
        ))
    }

    async fn get_user_info(&self, token: &TokenData) -> Result<String, GatewayError> {
        if token.id_token.is_empty() {
            return Err(GatewayError::Token(
                "ID token is required for k8s userinfo".to_string(),
            ));
        }
        username_from_token(&token.id_token).map_err(GatewayError::Token)
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenExchange, GatewayError> {
        Err(GatewayError::UnsupportedOperation(
            "token refresh is not supported for k8s token auth".to_string(),
        ))
    }

    async fn logout(&self, _token: &TokenData) -> Result<Option<String>, GatewayError> {
        Ok(None)
    }

    fn login_redirect_url(&self, _pkce: &PkceChallenge) -> Result<String, GatewayError> {
        Err(GatewayError::UnsupportedOperation(
            "token auth has no login redirect".to_string(),
        ))
    }
}
