//! Token endpoint client shared by the authorization-code and refresh grants

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::{Map, Value};

use crate::error::{GatewayError, ProtocolError, UpstreamError};
use crate::session::TokenData;
use crate::utils::secrets::{mask_secret, sanitize_url};

/// Longest slice of an unrecognised error body carried into the error description
const ERROR_BODY_PREVIEW: usize = 200;

/// Grant sent to the token endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    AuthorizationCode {
        code: String,
        /// Empty when no verifier could be recovered; the field is then omitted
        code_verifier: String,
    },
    RefreshToken(String),
}

impl Grant {
    #[must_use]
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken(_) => "refresh_token",
        }
    }
}

/// Normalized token endpoint response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenExchange {
    pub token: TokenData,
    pub expires_in: Option<i64>,
}

impl TokenExchange {
    /// Stamp the provider name onto the session payload
    #[must_use]
    pub fn for_provider(mut self, provider: &str) -> Self {
        self.token = self.token.with_provider(provider);
        self
    }
}

#[derive(Debug, Clone)]
pub struct TokenEndpointClient {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
    rewrite_created: bool,
}

impl TokenEndpointClient {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        token_url: &str,
        client_id: &str,
        client_secret: Option<String>,
        redirect_uri: &str,
    ) -> Self {
        Self {
            http,
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.filter(|s| !s.is_empty()),
            redirect_uri: redirect_uri.to_string(),
            rewrite_created: false,
        }
    }

    /// Treat `201 Created` from the token endpoint as `200 OK`.
    ///
    /// The AAP gateway answers token requests with 201.
    #[must_use]
    pub fn rewrite_created_status(mut self) -> Self {
        self.rewrite_created = true;
        self
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Form fields for `grant`
    #[must_use]
    pub fn form_params(&self, grant: &Grant) -> Vec<(&'static str, String)> {
        let mut params = vec![("grant_type", grant.grant_type().to_string())];

        match grant {
            Grant::AuthorizationCode {
                code,
                code_verifier,
            } => {
                params.push(("code", code.clone()));
                params.push(("redirect_uri", self.redirect_uri.clone()));
                if !code_verifier.is_empty() {
                    params.push(("code_verifier", code_verifier.clone()));
                }
            }
            Grant::RefreshToken(refresh_token) => {
                params.push(("refresh_token", refresh_token.clone()));
            }
        }

        params.push(("client_id", self.client_id.clone()));
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.clone()));
        }
        params
    }

    fn effective_status(&self, status: StatusCode) -> StatusCode {
        if self.rewrite_created && status == StatusCode::CREATED {
            StatusCode::OK
        } else {
            status
        }
    }

    /// Run `grant` against the token endpoint and normalize the response
    ///
    /// # Errors
    ///
    /// - `UpstreamError` when the endpoint cannot be reached or the body cannot be read
    /// - `ProtocolError::OAuth` for any status other than 200 or an OAuth error body
    /// - `ProtocolError::InvalidExpiry` / `MalformedResponse` for unusable bodies
    pub async fn execute(&self, grant: &Grant) -> Result<TokenExchange, GatewayError> {
        log::debug!(
            "Requesting {} grant from {} (client_id: {})",
            grant.grant_type(),
            sanitize_url(&self.token_url),
            mask_secret(&self.client_id)
        );

        let response = self
            .http
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .form(&self.form_params(grant))
            .send()
            .await?;

        let status = self.effective_status(response.status());
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Body(e.to_string()))?;

        if status != StatusCode::OK {
            log::warn!(
                "Token endpoint {} returned {status}",
                sanitize_url(&self.token_url)
            );
            return Err(oauth_error_from_body(status, &body).into());
        }

        parse_token_response(&body)
    }
}

/// Build the protocol error for a non-200 token response
fn oauth_error_from_body(status: StatusCode, body: &str) -> ProtocolError {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        if let Some(error) = oauth_error_fields(&fields) {
            return error;
        }
    }

    let preview: String = body.trim().chars().take(ERROR_BODY_PREVIEW).collect();
    ProtocolError::OAuth {
        error: format!("http_{}", status.as_u16()),
        description: Some(preview).filter(|s| !s.is_empty()),
    }
}

fn oauth_error_fields(fields: &Map<String, Value>) -> Option<ProtocolError> {
    let error = fields.get("error").and_then(Value::as_str)?;
    Some(ProtocolError::OAuth {
        error: error.to_string(),
        description: fields
            .get("error_description")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Normalize a successful token endpoint body.
///
/// Some providers (GitHub among them) report OAuth errors with a 200 status,
/// so an `error` field without an `access_token` is still a failure.
///
/// # Errors
///
/// Returns a protocol error for non-JSON bodies, OAuth error bodies, a missing
/// `access_token` or an unusable `expires_in`
pub fn parse_token_response(body: &str) -> Result<TokenExchange, GatewayError> {
    let fields = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => {
            return Err(
                ProtocolError::MalformedResponse("token response is not an object".into()).into(),
            )
        }
        Err(e) => return Err(ProtocolError::MalformedResponse(e.to_string()).into()),
    };

    let access_token = string_field(&fields, "access_token");
    if access_token.is_empty() {
        if let Some(error) = oauth_error_fields(&fields) {
            return Err(error.into());
        }
        return Err(ProtocolError::MalformedResponse("missing access_token".into()).into());
    }

    log::debug!(
        "Token response fields: {:?}",
        fields.keys().collect::<Vec<_>>()
    );

    let expires_in = coerce_expires_in(fields.get("expires_in"))?;

    Ok(TokenExchange {
        token: TokenData {
            id_token: string_field(&fields, "id_token"),
            access_token,
            refresh_token: string_field(&fields, "refresh_token"),
            provider: String::new(),
        },
        expires_in,
    })
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Coerce an upstream `expires_in` into whole seconds.
///
/// Numbers are truncated and numeric strings parsed; an absent or `null`
/// value is `None`.
///
/// # Errors
///
/// Returns `ProtocolError::InvalidExpiry` for any other representation
pub fn coerce_expires_in(value: Option<&Value>) -> Result<Option<i64>, ProtocolError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => {
            if let Some(seconds) = number.as_i64() {
                return Ok(Some(seconds));
            }
            match number.as_f64() {
                #[allow(clippy::cast_possible_truncation)]
                Some(seconds) if seconds.is_finite() => Ok(Some(seconds.trunc() as i64)),
                _ => Err(ProtocolError::InvalidExpiry(number.to_string())),
            }
        }
        Some(Value::String(raw)) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ProtocolError::InvalidExpiry(format!("{raw:?}"))),
        Some(other) => Err(ProtocolError::InvalidExpiry(other.to_string())),
    }
}
