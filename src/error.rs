//! Error taxonomy for the gateway
//!
//! Every fallible operation in the providers, the protocol engine and the
//! session codec returns a [`GatewayError`]. The HTTP status a failure maps to
//! is decided here, in one place, rather than in each handler.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::utils::responses::ResponseBuilder;

/// Problems with the provider configuration itself
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("provider '{0}' not found")]
    NotFound(String),
    #[error("provider '{0}' is disabled")]
    Disabled(String),
    #[error("invalid provider configuration: {0}")]
    Invalid(String),
    #[error("authentication is disabled")]
    AuthDisabled,
}

/// Failures talking to an IdP or the backend API
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(u16),
    /// Non-200 answer from a userinfo endpoint; the only status relayed to the client
    #[error("userinfo endpoint returned status {0}")]
    UserInfoStatus(u16),
    #[error("failed to read upstream response: {0}")]
    Body(String),
}

/// The upstream answered, but not in a way the OAuth protocol allows
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("oauth error '{error}': {}", .description.as_deref().unwrap_or("no description"))]
    OAuth {
        error: String,
        description: Option<String>,
    },
    #[error("invalid expires_in value: {0}")]
    InvalidExpiry(String),
    #[error("invalid discovery document: {0}")]
    Discovery(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("token error: {0}")]
    Token(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(UpstreamError::Request(err))
    }
}

impl GatewayError {
    /// Whether this failure means the caller's session can no longer be used.
    ///
    /// Session-bound handlers clear the cookie when this returns `true` so the
    /// client re-authenticates instead of looping on a stale session.
    #[must_use]
    pub fn clears_session(&self) -> bool {
        matches!(
            self,
            Self::Token(_)
                | Self::Session(_)
                | Self::Config(ConfigError::NotFound(_) | ConfigError::Disabled(_))
                | Self::Upstream(UpstreamError::Status(401) | UpstreamError::UserInfoStatus(401))
        )
    }

    /// Short machine-readable code used as the `error` field of the response body
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(ConfigError::NotFound(_)) => "provider_not_found",
            Self::Config(ConfigError::Disabled(_)) => "provider_disabled",
            Self::Config(ConfigError::Invalid(_)) => "invalid_provider_config",
            Self::Config(ConfigError::AuthDisabled) => "auth_disabled",
            Self::Upstream(_) => "upstream_error",
            Self::Protocol(_) => "protocol_error",
            Self::Token(_) => "invalid_token",
            Self::Session(_) => "invalid_session",
            Self::UnsupportedOperation(_) => "unsupported_operation",
            Self::BadRequest(_) => "invalid_request",
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(ConfigError::NotFound(_) | ConfigError::Disabled(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Config(ConfigError::Invalid(_))
            | Self::UnsupportedOperation(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(ConfigError::AuthDisabled) => StatusCode::IM_A_TEAPOT,
            Self::Upstream(UpstreamError::UserInfoStatus(code)) => StatusCode::from_u16(*code)
                .ok()
                .filter(|status| status.is_client_error() || status.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Token(_) | Self::Session(_) => StatusCode::UNAUTHORIZED,
            Self::Upstream(_) | Self::Protocol(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let builder = ResponseBuilder::error(self.status_code())
            .with_error_code(self.error_code())
            .with_message(&self.to_string());

        if self.clears_session() {
            builder.clear_site_data().build()
        } else {
            builder.build()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::from(ConfigError::NotFound("x".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::from(ConfigError::Invalid("bad".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::from(ConfigError::AuthDisabled).status_code(),
            StatusCode::IM_A_TEAPOT
        );
        assert_eq!(
            GatewayError::Token("missing".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::from(ProtocolError::InvalidExpiry("true".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::from(UpstreamError::UserInfoStatus(403)).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GatewayError::UnsupportedOperation("refresh".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_upstream_status_is_not_relayed() {
        for code in [302, 404, 418, 503] {
            assert_eq!(
                GatewayError::from(UpstreamError::Status(code)).status_code(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "status {code}"
            );
        }
        // a redirect from a userinfo endpoint is still an upstream failure
        assert_eq!(
            GatewayError::from(UpstreamError::UserInfoStatus(302)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::from(UpstreamError::UserInfoStatus(503)).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_clears_session() {
        assert!(GatewayError::Session("bad cookie".into()).clears_session());
        assert!(GatewayError::from(ConfigError::Disabled("p".into())).clears_session());
        assert!(GatewayError::from(UpstreamError::Status(401)).clears_session());
        assert!(GatewayError::from(UpstreamError::UserInfoStatus(401)).clears_session());
        assert!(!GatewayError::from(UpstreamError::Status(500)).clears_session());
        assert!(!GatewayError::UnsupportedOperation("refresh".into()).clears_session());
    }

    #[test]
    fn test_oauth_error_display() {
        let err = ProtocolError::OAuth {
            error: "invalid_grant".into(),
            description: Some("code expired".into()),
        };
        assert_eq!(err.to_string(), "oauth error 'invalid_grant': code expired");

        let err = ProtocolError::OAuth {
            error: "invalid_grant".into(),
            description: None,
        };
        assert_eq!(err.to_string(), "oauth error 'invalid_grant': no description");
    }
}
