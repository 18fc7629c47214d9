// Provider configuration test endpoint
use std::time::Duration;

use actix_web::{web, HttpResponse, Result};

use super::reject;
use crate::registry::ProviderRegistry;
use crate::utils::{LoggingHelper, ResponseBuilder};
use crate::validation::test_provider_configuration;

/// HTTP client used for validation probes, kept apart from the request client
/// so probes get their own, shorter timeout
#[derive(Debug, Clone, Default)]
pub struct ValidationClient(reqwest::Client);

impl ValidationClient {
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized
    pub fn with_timeout(timeout: Duration) -> reqwest::Result<Self> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map(Self)
    }

    #[must_use]
    pub fn from_client(client: reqwest::Client) -> Self {
        Self(client)
    }

    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.0
    }
}

/// `POST /authproviders/{name}/test`
///
/// Answers the full validation report, whether or not the configuration is
/// valid. Disabled providers can be tested too.
///
/// # Errors
/// Never fails at the actix level; `404` for unknown providers
pub async fn test_provider(
    path: web::Path<String>,
    registry: web::Data<ProviderRegistry>,
    validation: web::Data<ValidationClient>,
) -> Result<HttpResponse> {
    let name = path.into_inner();
    let spec = match registry.configured_spec(&name).await {
        Ok(spec) => spec,
        Err(e) => {
            log::warn!("Cannot test provider '{name}': {e}");
            return Ok(reject(&e));
        }
    };

    let result = test_provider_configuration(&spec, validation.client()).await;
    LoggingHelper::log_configuration_test(
        &name,
        result.valid,
        result.summary.error_fields,
        result.summary.warning_fields,
    );
    Ok(ResponseBuilder::ok().json(&result))
}

#[cfg(test)]
mod tests {
    use crate::handlers::configure_services;
    use crate::registry::{ProviderSpec, ProviderType};
    use crate::testing::fixtures::TestFixtures;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_unknown_provider_is_404() {
        let registry = TestFixtures::registry(vec![], None);
        let app = test::init_service(
            App::new()
                .configure(TestFixtures::app_config(registry))
                .configure(configure_services),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/authproviders/ghost/test")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "provider_not_found");
    }

    #[actix_web::test]
    async fn test_disabled_provider_is_tested() {
        let mut spec = ProviderSpec::new("cluster", ProviderType::K8s);
        spec.enabled = false;
        let registry = TestFixtures::registry(vec![spec], None);
        let app = test::init_service(
            App::new()
                .configure(TestFixtures::app_config(registry))
                .configure(configure_services),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/authproviders/cluster/test")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["summary"]["providerName"], "cluster");
        assert_eq!(body["clientId"]["valid"], true);
    }
}
