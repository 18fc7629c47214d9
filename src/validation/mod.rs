//! Provider configuration validator
//!
//! Probes a candidate provider and reports per field what is wrong with it.
//! Nothing here fails: every problem becomes a note in the
//! [`ProviderValidationResult`].

pub mod checks;
pub mod types;

pub use types::{
    FieldValidation, NoteLevel, OAuth2SettingsValidation, OidcDiscoveryValidation,
    OrgAssignmentValidation, ProviderValidationResult, ValidationNote, ValidationSummary,
};

use crate::registry::{ProviderSpec, ProviderType};

/// Validate a provider configuration, probing its endpoints with `client`
///
/// `client` should carry the validation timeout; every probe is a single
/// request and nothing is retried.
pub async fn test_provider_configuration(
    spec: &ProviderSpec,
    client: &reqwest::Client,
) -> ProviderValidationResult {
    log::info!(
        "Testing configuration of {} provider '{}'",
        spec.provider_type,
        spec.name
    );

    let mut result = ProviderValidationResult {
        client_id: checks::check_client_id(spec),
        username_claim: checks::check_username_claim(spec),
        ..ProviderValidationResult::default()
    };

    match spec.provider_type {
        ProviderType::Oidc => checks::check_oidc(spec, client, &mut result).await,
        ProviderType::OAuth2 => {
            result.oauth2_settings = Some(checks::check_oauth2(spec, client).await);
        }
        ProviderType::Aap | ProviderType::OpenShift => {
            checks::check_auth_url(spec, client, &mut result).await;
        }
        ProviderType::K8s if spec.is_openshift_oauth() => {
            checks::check_auth_url(spec, client, &mut result).await;
        }
        ProviderType::K8s => {}
    }

    result.organization_assignment = checks::check_organization_assignment(spec);
    result.summary = checks::build_summary(&result, &spec.name);
    result.valid = result.summary.error_fields == 0;

    log::debug!(
        "Validation of '{}' finished: {} field(s), {} error(s), {} warning(s)",
        spec.name,
        result.summary.total_fields,
        result.summary.error_fields,
        result.summary.warning_fields
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Scopes;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[actix_web::test]
    async fn test_oidc_with_discovery() {
        let server = MockServer::start().await;
        let base = server.uri();
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": base,
                "authorization_endpoint": format!("{base}/auth"),
                "token_endpoint": format!("{base}/token"),
                "userinfo_endpoint": format!("{base}/userinfo"),
                "end_session_endpoint": format!("{base}/logout"),
                "scopes_supported": ["openid", "profile"],
                "grant_types_supported": ["authorization_code", "refresh_token"]
            })))
            .mount(&server)
            .await;

        let mut spec = ProviderSpec::new("sso", ProviderType::Oidc);
        spec.client_id = "ui".into();
        spec.issuer = Some(base.clone());

        let result = test_provider_configuration(&spec, &reqwest::Client::new()).await;
        let discovery = result.oidc_discovery.as_ref().unwrap();
        assert!(discovery.reachable);
        assert_eq!(discovery.supported_scopes, vec!["openid", "profile"]);
        assert!(result.valid);
        // http issuer
        assert_eq!(result.summary.warning_fields, 1);
        assert_eq!(result.summary.total_fields, 7);
        assert_eq!(
            result.summary.next_steps,
            vec!["Configuration is valid but has warnings"]
        );
    }

    #[actix_web::test]
    async fn test_oidc_unreachable_discovery() {
        let server = MockServer::start().await;
        let mut spec = ProviderSpec::new("sso", ProviderType::Oidc);
        spec.client_id = "ui".into();
        spec.issuer = Some(server.uri());

        let result = test_provider_configuration(&spec, &reqwest::Client::new()).await;
        assert!(!result.valid);
        let discovery = result.oidc_discovery.unwrap();
        assert!(!discovery.reachable);
        assert!(discovery.discovery_url.notes[0].text.contains("HTTP 404"));
        assert!(!result.issuer.unwrap().valid);
    }

    #[actix_web::test]
    async fn test_oauth2_missing_fields() {
        let spec = ProviderSpec::new("gh", ProviderType::OAuth2);
        let result = test_provider_configuration(&spec, &reqwest::Client::new()).await;

        assert!(!result.valid);
        let settings = result.oauth2_settings.unwrap();
        assert!(!settings.valid);
        // clientId plus the four OAuth2 fields
        assert_eq!(result.summary.error_fields, 5);
        assert_eq!(
            result.summary.next_steps,
            vec!["Fix 5 required field(s) marked with errors"]
        );
    }

    #[actix_web::test]
    async fn test_oauth2_all_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/authorize"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let base = server.uri();
        let mut spec = ProviderSpec::new("gh", ProviderType::OAuth2);
        spec.client_id = "ui".into();
        spec.authorization_url = Some(format!("{base}/authorize"));
        spec.token_url = Some(format!("{base}/token"));
        spec.user_info_url = Some(format!("{base}/user"));
        spec.scopes = Some(Scopes::Joined("read:user".into()));

        let result = test_provider_configuration(&spec, &reqwest::Client::new()).await;
        assert!(result.valid, "{result:?}");
        assert!(result.oauth2_settings.unwrap().valid);
        assert_eq!(result.summary.total_fields, 5);
        assert_eq!(
            result.summary.next_steps,
            vec!["✓ All validations passed", "✓ Configuration is ready to use"]
        );
    }

    #[actix_web::test]
    async fn test_k8s_needs_no_endpoints() {
        let spec = ProviderSpec::new("k8s", ProviderType::K8s);
        let result = test_provider_configuration(&spec, &reqwest::Client::new()).await;
        assert!(result.valid);
        assert!(result.auth_url.is_none());
        assert!(result.oauth2_settings.is_none());
    }

    #[actix_web::test]
    async fn test_openshift_requires_urls() {
        let mut spec = ProviderSpec::new("ocp", ProviderType::OpenShift);
        spec.client_id = "console".into();
        let result = test_provider_configuration(&spec, &reqwest::Client::new()).await;
        assert!(!result.valid);
        assert!(!result.auth_url.unwrap().valid);
        assert!(!result.token_url.unwrap().valid);
    }
}
