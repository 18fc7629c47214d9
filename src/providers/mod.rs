//! Authentication provider variants
//!
//! Every provider implements [`AuthProvider`]. A [`ProviderVariant`] is built
//! per request by the registry from the current provider configuration and
//! dropped when the request completes.

pub mod aap;
pub mod k8s;
pub mod oauth2;
pub mod oidc;
pub mod openshift;

pub use aap::AapProvider;
pub use k8s::K8sProvider;
pub use oauth2::OAuth2Provider;
pub use oidc::OidcProvider;
pub use openshift::OpenShiftProvider;

use async_trait::async_trait;
use serde_json::Value;

use crate::claims::{resolve_username, ANONYMOUS_USERNAME};
use crate::error::{ConfigError, GatewayError};
use crate::models::LoginParameters;
use crate::oauth::{
    AuthorizationRequest, Grant, OAuthState, PkceChallenge, TokenEndpointClient, TokenExchange,
};
use crate::registry::{ProviderSpec, ProviderType};
use crate::session::TokenData;
use crate::settings::GatewaySettings;

/// Common contract of all provider variants
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Name the provider is configured under
    fn name(&self) -> &str;

    /// Exchange an authorization code for tokens
    ///
    /// # Arguments
    /// * `params` - The authorization code and the PKCE verifier recovered for it
    ///
    /// # Errors
    /// Returns an error if:
    /// - The variant has no code flow
    /// - The token endpoint cannot be reached
    /// - The token endpoint answers with an OAuth error or an unusable body
    async fn get_token(&self, params: &LoginParameters) -> Result<TokenExchange, GatewayError>;

    /// Resolve the display username for a session
    ///
    /// # Errors
    /// Returns an error if:
    /// - The token this variant needs is absent (`GatewayError::Token`)
    /// - The userinfo endpoint answers with a non-200 status
    async fn get_user_info(&self, token: &TokenData) -> Result<String, GatewayError>;

    /// Exchange a refresh token for a new token set
    ///
    /// # Errors
    /// Returns an error if:
    /// - The variant has no refresh semantics
    /// - The refresh token is empty
    /// - The token endpoint rejects the grant
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenExchange, GatewayError>;

    /// End the session at the IdP
    ///
    /// # Returns
    /// The URL the browser should visit to finish logging out, if the IdP has one
    ///
    /// # Errors
    /// Returns an error if the IdP could not be told about the logout
    async fn logout(&self, token: &TokenData) -> Result<Option<String>, GatewayError>;

    /// Build the authorization request URL for a login attempt
    ///
    /// # Errors
    /// Returns an error if the variant has no redirect flow or its authorize
    /// endpoint is not a valid URL
    fn login_redirect_url(&self, pkce: &PkceChallenge) -> Result<String, GatewayError>;
}

/// A resolved provider, one variant per provider type
#[derive(Debug)]
pub enum ProviderVariant {
    K8s(K8sProvider),
    Oidc(OidcProvider),
    OAuth2(OAuth2Provider),
    Aap(AapProvider),
    OpenShift(OpenShiftProvider),
}

impl ProviderVariant {
    #[must_use]
    pub fn as_provider(&self) -> &dyn AuthProvider {
        match self {
            Self::K8s(p) => p,
            Self::Oidc(p) => p,
            Self::OAuth2(p) => p,
            Self::Aap(p) => p,
            Self::OpenShift(p) => p,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ProviderType {
        match self {
            Self::K8s(_) => ProviderType::K8s,
            Self::Oidc(_) => ProviderType::Oidc,
            Self::OAuth2(_) => ProviderType::OAuth2,
            Self::Aap(_) => ProviderType::Aap,
            Self::OpenShift(_) => ProviderType::OpenShift,
        }
    }

    /// The bearer-token provider, for the direct token login
    #[must_use]
    pub fn as_token_provider(&self) -> Option<&K8sProvider> {
        match self {
            Self::K8s(p) => Some(p),
            _ => None,
        }
    }
}

/// Everything a variant needs besides its own spec
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub http: reqwest::Client,
    /// Backend API base URL, used to validate bearer tokens
    pub api_url: String,
    /// Public UI URL; OAuth callbacks land on `{base_ui_url}/callback`
    pub base_ui_url: String,
    pub pkce_state_fallback: bool,
}

impl ProviderContext {
    #[must_use]
    pub fn from_settings(settings: &GatewaySettings, http: reqwest::Client) -> Self {
        Self {
            http,
            api_url: settings.api.api_url.trim_end_matches('/').to_string(),
            base_ui_url: settings.application.base_ui_url.trim_end_matches('/').to_string(),
            pkce_state_fallback: settings.auth.pkce_state_fallback,
        }
    }

    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}/callback", self.base_ui_url)
    }
}

/// Authorization-code client shared by the OAuth based variants
#[derive(Debug, Clone)]
pub struct OAuthClient {
    provider: String,
    authorize_url: String,
    client_id: String,
    redirect_uri: String,
    scope: Option<String>,
    pkce_state_fallback: bool,
    token_client: TokenEndpointClient,
}

impl OAuthClient {
    #[must_use]
    pub fn new(
        spec: &ProviderSpec,
        context: &ProviderContext,
        authorize_url: &str,
        token_url: &str,
        scope: Option<String>,
    ) -> Self {
        let client_id = spec.get_client_id();
        let redirect_uri = context.redirect_uri();
        Self {
            provider: spec.name.clone(),
            authorize_url: authorize_url.to_string(),
            token_client: TokenEndpointClient::new(
                context.http.clone(),
                token_url,
                &client_id,
                spec.get_client_secret(),
                &redirect_uri,
            ),
            client_id,
            redirect_uri,
            scope,
            pkce_state_fallback: context.pkce_state_fallback,
        }
    }

    #[must_use]
    pub fn rewrite_created_status(mut self) -> Self {
        self.token_client = self.token_client.rewrite_created_status();
        self
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        self.token_client.token_url()
    }

    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// `provider:<name>`, with the verifier appended when the state fallback is on
    #[must_use]
    pub fn state_for(&self, pkce: &PkceChallenge) -> String {
        let state = OAuthState::new(&self.provider);
        if self.pkce_state_fallback {
            state.with_verifier(&pkce.code_verifier).encode()
        } else {
            state.encode()
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the authorize endpoint is not a valid URL
    pub fn redirect_url(&self, pkce: &PkceChallenge) -> Result<String, GatewayError> {
        let url =
            AuthorizationRequest::new(&self.authorize_url, &self.client_id, &self.redirect_uri)
                .scope(self.scope.clone())
                .state(self.state_for(pkce))
                .pkce(pkce)
                .build()?;
        log::info!("Issued login redirect for provider '{}'", self.provider);
        Ok(url)
    }

    /// # Errors
    ///
    /// See [`TokenEndpointClient::execute`]
    pub async fn exchange_code(
        &self,
        params: &LoginParameters,
    ) -> Result<TokenExchange, GatewayError> {
        if params.verifier().is_empty() {
            log::warn!(
                "No PKCE verifier recovered for provider '{}'; exchanging code without one",
                self.provider
            );
        }
        let grant = Grant::AuthorizationCode {
            code: params.code.clone(),
            code_verifier: params.verifier().to_string(),
        };
        self.token_client.execute(&grant).await
    }

    /// # Errors
    ///
    /// Returns `GatewayError::Token` for an empty refresh token, otherwise see
    /// [`TokenEndpointClient::execute`]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenExchange, GatewayError> {
        if refresh_token.is_empty() {
            return Err(GatewayError::Token(format!(
                "no refresh token in session for provider '{}'",
                self.provider
            )));
        }
        self.token_client
            .execute(&Grant::RefreshToken(refresh_token.to_string()))
            .await
    }
}

/// Require a configured value, naming the provider and field on failure
pub(crate) fn required<'a>(
    value: Option<&'a str>,
    spec: &ProviderSpec,
    field: &str,
) -> Result<&'a str, GatewayError> {
    value.ok_or_else(|| {
        ConfigError::Invalid(format!(
            "{} provider '{}' requires {field}",
            spec.provider_type, spec.name
        ))
        .into()
    })
}

pub(crate) fn required_client_id(spec: &ProviderSpec) -> Result<(), GatewayError> {
    if spec.get_client_id().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "{} provider '{}' requires clientId",
            spec.provider_type, spec.name
        ))
        .into());
    }
    Ok(())
}

/// Username from a userinfo document, falling back to [`ANONYMOUS_USERNAME`]
pub(crate) fn username_or_anonymous(
    provider: &str,
    userinfo: &Value,
    claim_path: &[String],
) -> String {
    resolve_username(userinfo, claim_path).unwrap_or_else(|| {
        log::warn!(
            "No username claim found in userinfo for provider '{provider}', \
             user will appear as '{ANONYMOUS_USERNAME}'"
        );
        ANONYMOUS_USERNAME.to_string()
    })
}

/// Configured username claim path, or `default` when none is set
pub(crate) fn claim_path_or(
    spec: &ProviderSpec,
    default: &[&str],
) -> Result<Vec<String>, GatewayError> {
    match spec.username_claim_path() {
        Ok(Some(path)) => Ok(path),
        Ok(None) => Ok(default.iter().map(|s| (*s).to_string()).collect()),
        Err(e) => Err(ConfigError::Invalid(format!(
            "provider '{}' has an invalid usernameClaim: {e}",
            spec.name
        ))
        .into()),
    }
}
