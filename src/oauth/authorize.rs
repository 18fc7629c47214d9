//! Authorization request URLs

use url::Url;

use super::pkce::{PkceChallenge, CODE_CHALLENGE_METHOD};
use crate::error::{ConfigError, GatewayError};

/// Builder for the URL the browser is sent to in order to log in
#[derive(Debug, Clone)]
pub struct AuthorizationRequest<'a> {
    authorize_url: &'a str,
    client_id: &'a str,
    redirect_uri: &'a str,
    scope: Option<String>,
    state: Option<String>,
    code_challenge: Option<String>,
}

impl<'a> AuthorizationRequest<'a> {
    #[must_use]
    pub fn new(authorize_url: &'a str, client_id: &'a str, redirect_uri: &'a str) -> Self {
        Self {
            authorize_url,
            client_id,
            redirect_uri,
            scope: None,
            state: None,
            code_challenge: None,
        }
    }

    #[must_use]
    pub fn scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope.filter(|s| !s.is_empty());
        self
    }

    #[must_use]
    pub fn state(mut self, state: String) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn pkce(mut self, pkce: &PkceChallenge) -> Self {
        self.code_challenge = Some(pkce.code_challenge.clone());
        self
    }

    /// Render the request as a URL, keeping any query the endpoint already has
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when the authorize URL does not parse
    pub fn build(self) -> Result<String, GatewayError> {
        let mut url = Url::parse(self.authorize_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "invalid authorization endpoint '{}': {e}",
                self.authorize_url
            ))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", self.client_id)
                .append_pair("redirect_uri", self.redirect_uri);
            if let Some(scope) = &self.scope {
                query.append_pair("scope", scope);
            }
            if let Some(state) = &self.state {
                query.append_pair("state", state);
            }
            if let Some(challenge) = &self.code_challenge {
                query
                    .append_pair("code_challenge", challenge)
                    .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);
            }
        }

        Ok(url.to_string())
    }
}
