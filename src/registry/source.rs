//! Where provider configuration comes from

use async_trait::async_trait;
use reqwest::StatusCode;

use super::AuthConfig;
use crate::error::{ConfigError, GatewayError, UpstreamError};
use crate::settings::GatewaySettings;

const AUTH_CONFIG_PATH: &str = "/api/v1/auth/config";

/// Read-only source of the current provider configuration
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch the current configuration
    ///
    /// # Returns
    /// `None` when authentication is disabled
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be fetched or parsed
    async fn fetch_auth_config(&self) -> Result<Option<AuthConfig>, GatewayError>;
}

/// Fetches the configuration from the backend API on every call
#[derive(Debug, Clone)]
pub struct ApiConfigSource {
    http: reqwest::Client,
    config_url: String,
}

impl ApiConfigSource {
    #[must_use]
    pub fn new(http: reqwest::Client, api_url: &str) -> Self {
        Self {
            http,
            config_url: format!("{}{AUTH_CONFIG_PATH}", api_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl ConfigSource for ApiConfigSource {
    async fn fetch_auth_config(&self) -> Result<Option<AuthConfig>, GatewayError> {
        let response = self.http.get(&self.config_url).send().await?;
        let status = response.status();

        // the API answers 418 when authentication is turned off
        if status == StatusCode::IM_A_TEAPOT {
            return Ok(None);
        }
        if !status.is_success() {
            log::warn!("Auth config request to {} returned {status}", self.config_url);
            return Err(UpstreamError::Status(status.as_u16()).into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Body(e.to_string()))?;
        let config = serde_json::from_str(&body)
            .map_err(|e| ConfigError::Invalid(format!("unreadable auth config: {e}")))?;
        Ok(Some(config))
    }
}

/// Serves a fixed configuration, normally the `[[providers]]` table of the settings file
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    config: Option<AuthConfig>,
}

impl StaticConfigSource {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Some(config),
        }
    }

    /// A source reporting authentication as disabled
    #[must_use]
    pub fn disabled() -> Self {
        Self { config: None }
    }

    #[must_use]
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        Self::new(AuthConfig {
            providers: settings.providers.clone(),
            default_provider: settings.auth.default_provider.clone(),
            organizations_enabled: settings.auth.organizations_enabled,
        })
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn fetch_auth_config(&self) -> Result<Option<AuthConfig>, GatewayError> {
        Ok(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProviderType;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn api_returning(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(AUTH_CONFIG_PATH))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[actix_web::test]
    async fn test_api_source_parses_config() {
        let server = api_returning(ResponseTemplate::new(200).set_body_json(json!({
            "defaultProvider": "k8s",
            "organizationsEnabled": true,
            "providers": [
                {"name": "k8s", "type": "k8s"},
                {"name": "sso", "type": "oidc", "issuer": "https://sso", "clientId": "ui",
                 "enabled": false}
            ]
        })))
        .await;

        let source = ApiConfigSource::new(reqwest::Client::new(), &format!("{}/", server.uri()));
        let config = source.fetch_auth_config().await.unwrap().unwrap();
        assert_eq!(config.default_provider.as_deref(), Some("k8s"));
        assert!(config.organizations_enabled);
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.find("sso").unwrap().provider_type, ProviderType::Oidc);
        assert!(!config.find("sso").unwrap().enabled);
    }

    #[actix_web::test]
    async fn test_api_source_teapot_means_disabled() {
        let server = api_returning(ResponseTemplate::new(418)).await;
        let source = ApiConfigSource::new(reqwest::Client::new(), &server.uri());
        assert!(source.fetch_auth_config().await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_api_source_errors() {
        let server = api_returning(ResponseTemplate::new(503)).await;
        let source = ApiConfigSource::new(reqwest::Client::new(), &server.uri());
        assert!(matches!(
            source.fetch_auth_config().await,
            Err(GatewayError::Upstream(UpstreamError::Status(503)))
        ));

        let server = api_returning(
            ResponseTemplate::new(200)
                .set_body_json(json!({"providers": [{"name": "x", "type": "saml"}]})),
        )
        .await;
        let source = ApiConfigSource::new(reqwest::Client::new(), &server.uri());
        assert!(matches!(
            source.fetch_auth_config().await,
            Err(GatewayError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[actix_web::test]
    async fn test_static_source() {
        assert!(StaticConfigSource::disabled()
            .fetch_auth_config()
            .await
            .unwrap()
            .is_none());

        let mut settings = GatewaySettings::default();
        settings.auth.default_provider = Some("k8s".into());
        settings
            .providers
            .push(crate::registry::ProviderSpec::new("k8s", ProviderType::K8s));
        let config = StaticConfigSource::from_settings(&settings)
            .fetch_auth_config()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.default_provider.as_deref(), Some("k8s"));
    }
}
