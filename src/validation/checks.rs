//! Individual checks run by [`super::test_provider_configuration`]

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use url::Url;

use super::types::{
    FieldValidation, OAuth2SettingsValidation, OidcDiscoveryValidation, OrgAssignmentValidation,
    ProviderValidationResult, ValidationSummary,
};
use crate::error::{GatewayError, ProtocolError, UpstreamError};
use crate::oauth::discovery::{discovery_url, fetch_discovery_document};
use crate::registry::{ProviderSpec, ProviderType};

const PROBE_BEARER_TOKEN: &str = "test-token-for-validation";

/// How an endpoint is probed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Get,
    /// `POST` with an empty form body, as a token endpoint expects
    Post,
    /// `GET` with a dummy bearer token; a 200 answer must be JSON
    UserInfo,
}

/// Probe an endpoint, returning why it is unusable
///
/// # Errors
///
/// Returns a human-readable reason when the endpoint cannot be reached,
/// answers 404/405 or 5xx, or (for [`Probe::UserInfo`]) answers 200 with a
/// non-JSON body
pub async fn probe_endpoint(
    client: &reqwest::Client,
    endpoint: &str,
    probe: Probe,
) -> Result<(), String> {
    let request = match probe {
        Probe::Get => client.get(endpoint),
        Probe::Post => client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(""),
        Probe::UserInfo => client
            .get(endpoint)
            .header(AUTHORIZATION, format!("Bearer {PROBE_BEARER_TOKEN}")),
    };

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            "endpoint unreachable: request timed out".to_string()
        } else {
            format!("endpoint unreachable: {e}")
        }
    })?;

    let status = response.status();
    match status {
        StatusCode::NOT_FOUND => return Err("endpoint not found (404)".to_string()),
        StatusCode::METHOD_NOT_ALLOWED => {
            let method = if probe == Probe::Post { "POST" } else { "GET" };
            return Err(format!("endpoint does not accept the {method} method (405)"));
        }
        s if s.is_server_error() => {
            return Err(format!("endpoint returned server error ({})", s.as_u16()));
        }
        _ => {}
    }

    if probe == Probe::UserInfo && status == StatusCode::OK {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.contains("application/json") {
            return Err(format!(
                "endpoint does not return JSON (got '{content_type}')"
            ));
        }
    }

    Ok(())
}

/// `clientId` check. Plain bearer-token providers need no client.
#[must_use]
pub fn check_client_id(spec: &ProviderSpec) -> FieldValidation {
    let client_id = spec.get_client_id();
    if is_token_auth(spec) {
        return FieldValidation::valid(&client_id)
            .with_info("Token authentication needs no client ID or OAuth endpoints");
    }
    if client_id.is_empty() {
        return FieldValidation::invalid("Client ID is required");
    }
    FieldValidation::valid(&client_id)
}

fn is_token_auth(spec: &ProviderSpec) -> bool {
    spec.provider_type == ProviderType::K8s && !spec.is_openshift_oauth()
}

/// `usernameClaim` check; an absent claim is reported with the default that applies
#[must_use]
pub fn check_username_claim(spec: &ProviderSpec) -> FieldValidation {
    let Some(claim) = &spec.username_claim else {
        let default = match spec.provider_type {
            ProviderType::OAuth2 => "the 'email' claim",
            ProviderType::Oidc => {
                "the first of preferred_username, email, sub, name, username"
            }
            ProviderType::Aap => "the username reported by the AAP gateway",
            ProviderType::K8s | ProviderType::OpenShift => "the service account name in the token",
        };
        return FieldValidation::valid("").with_info(format!(
            "No username claim configured, usernames are taken from {default}"
        ));
    };

    let raw = claim.display();
    match claim.segments() {
        Ok(_) => FieldValidation::valid(&raw),
        Err(e) => {
            FieldValidation::valid(&raw).with_error(format!("Invalid username claim path: {e}"))
        }
    }
}

/// Syntax check of an absolute http(s) URL
fn check_url(value: &str, label: &str) -> FieldValidation {
    let mut field = FieldValidation::valid(value);
    match Url::parse(value) {
        Ok(url) if url.scheme() == "https" => {}
        Ok(url) if url.scheme() == "http" => {
            field.add_warning(format!("{label} uses plain http, use https outside of development"));
        }
        Ok(url) => field.add_error(format!(
            "{label} must use http or https, not '{}'",
            url.scheme()
        )),
        Err(e) => field.add_error(format!("{label} is not a valid absolute URL: {e}")),
    }
    field
}

fn describe_fetch_error(err: &GatewayError) -> String {
    match err {
        GatewayError::Upstream(UpstreamError::Status(code)) => {
            format!("HTTP {code}: endpoint returned error")
        }
        GatewayError::Upstream(UpstreamError::Request(e)) if e.is_timeout() => {
            "connection error: request timed out".to_string()
        }
        GatewayError::Upstream(UpstreamError::Request(e)) => format!("connection error: {e}"),
        GatewayError::Protocol(ProtocolError::Discovery(e)) => {
            format!("invalid JSON response: {e}")
        }
        other => other.to_string(),
    }
}

fn discovered(value: Option<&str>, missing: &str) -> FieldValidation {
    match value.filter(|v| !v.is_empty()) {
        Some(endpoint) => FieldValidation::valid(endpoint),
        None => FieldValidation::invalid(format!("{missing} missing from discovery document")),
    }
}

/// Check the issuer and dereference its discovery document
pub async fn check_oidc(
    spec: &ProviderSpec,
    client: &reqwest::Client,
    result: &mut ProviderValidationResult,
) {
    let Some(issuer) = spec.issuer() else {
        result.issuer = Some(FieldValidation::invalid("OIDC provider requires an issuer URL"));
        return;
    };
    let issuer = issuer.trim_end_matches('/');
    let mut issuer_field = check_url(issuer, "Issuer");
    if !issuer_field.valid {
        result.issuer = Some(issuer_field);
        return;
    }

    let base = spec
        .internal_url()
        .map_or(issuer, |u| u.trim_end_matches('/'));
    let url = discovery_url(base);

    let document = match fetch_discovery_document(client, base).await {
        Ok(document) => document,
        Err(e) => {
            let reason = describe_fetch_error(&e);
            issuer_field.add_error(format!("Failed to fetch OIDC discovery document: {reason}"));
            result.issuer = Some(issuer_field);

            let unavailable = || {
                FieldValidation::invalid("Could not retrieve endpoint from discovery")
            };
            result.oidc_discovery = Some(OidcDiscoveryValidation {
                reachable: false,
                discovery_url: FieldValidation::valid(&url).with_error(reason),
                authorization_endpoint: unavailable(),
                token_endpoint: unavailable(),
                user_info_endpoint: unavailable(),
                ..OidcDiscoveryValidation::default()
            });
            return;
        }
    };
    result.issuer = Some(issuer_field);

    let mut validation = OidcDiscoveryValidation {
        reachable: true,
        discovery_url: FieldValidation::valid(&url),
        authorization_endpoint: discovered(
            document.authorization_endpoint.as_deref(),
            "authorization_endpoint",
        ),
        token_endpoint: discovered(document.token_endpoint.as_deref(), "token_endpoint"),
        user_info_endpoint: discovered(document.userinfo_endpoint.as_deref(), "userinfo_endpoint"),
        end_session_endpoint: Some(
            match document.end_session_endpoint.as_deref().filter(|v| !v.is_empty()) {
                Some(endpoint) => FieldValidation::valid(endpoint),
                None => FieldValidation::valid("").with_warning(
                    "end_session_endpoint not advertised, logout will only clear the local session",
                ),
            },
        ),
        supported_scopes: document.scopes_supported,
        supported_grant_types: document.grant_types_supported,
    };

    if !(validation.authorization_endpoint.valid
        && validation.token_endpoint.valid
        && validation.user_info_endpoint.valid)
    {
        validation
            .discovery_url
            .add_warning("Discovery document is missing required fields");
    }
    result.oidc_discovery = Some(validation);
}

async fn check_endpoint(
    client: &reqwest::Client,
    value: Option<&str>,
    probe: Probe,
    required_message: &str,
    reachable_message: &str,
) -> FieldValidation {
    let Some(endpoint) = value else {
        return FieldValidation::invalid(required_message);
    };
    let mut field = FieldValidation::valid(endpoint);
    match probe_endpoint(client, endpoint, probe).await {
        Ok(()) => field.add_info(reachable_message),
        Err(reason) => field.add_error(reason),
    }
    field
}

/// Check and probe the explicit endpoints of an OAuth2 provider
pub async fn check_oauth2(
    spec: &ProviderSpec,
    client: &reqwest::Client,
) -> OAuth2SettingsValidation {
    let authorization_endpoint = check_endpoint(
        client,
        spec.authorization_url(),
        Probe::Get,
        "Authorization endpoint is required for OAuth2 providers",
        "Authorization endpoint is reachable",
    )
    .await;
    let token_endpoint = check_endpoint(
        client,
        spec.token_url(),
        Probe::Post,
        "Token endpoint is required for OAuth2 providers",
        "Token endpoint is reachable and accepts POST method",
    )
    .await;
    let user_info_endpoint = check_endpoint(
        client,
        spec.user_info_url(),
        Probe::UserInfo,
        "UserInfo endpoint is required for OAuth2 providers",
        "User info endpoint is reachable and returns valid JSON",
    )
    .await;
    let scopes = match spec.scope_param() {
        Some(scopes) => FieldValidation::valid(&scopes),
        None => FieldValidation::invalid("OAuth2 provider requires scopes to be configured"),
    };

    OAuth2SettingsValidation {
        valid: authorization_endpoint.valid
            && token_endpoint.valid
            && user_info_endpoint.valid
            && scopes.valid,
        authorization_endpoint,
        token_endpoint,
        user_info_endpoint,
        scopes,
    }
}

/// Check `authUrl` (and for OpenShift `tokenUrl`) of AAP and OpenShift providers
pub async fn check_auth_url(
    spec: &ProviderSpec,
    client: &reqwest::Client,
    result: &mut ProviderValidationResult,
) {
    result.auth_url = Some(
        check_endpoint(
            client,
            spec.auth_url(),
            Probe::Get,
            &format!("{} provider requires authUrl", spec.provider_type),
            "Auth URL is reachable",
        )
        .await,
    );

    if spec.provider_type == ProviderType::OpenShift || spec.is_openshift_oauth() {
        result.token_url = Some(match spec.token_url() {
            Some(token_url) => check_url(token_url, "Token URL"),
            None => FieldValidation::invalid("OpenShift provider requires tokenUrl"),
        });
    }
}

/// Check the organization assignment policy, if one is configured
#[must_use]
pub fn check_organization_assignment(spec: &ProviderSpec) -> Option<OrgAssignmentValidation> {
    let assignment = spec.organization_assignment.as_ref()?;
    let kind = assignment.assignment_type.as_str();
    let mut validation = OrgAssignmentValidation {
        valid: true,
        assignment_type: FieldValidation::valid(kind),
        ..OrgAssignmentValidation::default()
    };

    match kind {
        "Dynamic" | "PerUser" => {
            validation.claim_path = Some(match &assignment.claim_path {
                Some(path) => claim_path_field(spec, path),
                None => FieldValidation::invalid(format!(
                    "Organization assignment type '{kind}' requires claimPath to be configured"
                )),
            });
        }
        "Static" => {
            validation.organization_name = Some(
                match assignment.organization_name.as_deref().filter(|n| !n.is_empty()) {
                    Some(name) => FieldValidation::valid(name),
                    None => FieldValidation::invalid(
                        "Static organization assignment requires organizationName",
                    ),
                },
            );
        }
        other => validation.assignment_type.add_error(format!(
            "Unknown organization assignment type '{other}', expected Static, Dynamic or PerUser"
        )),
    }

    let prefix = assignment.organization_name_prefix.as_deref();
    if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
        let field = FieldValidation::valid(prefix);
        validation.organization_name_prefix =
            Some(field.with_info("Prepended to assigned organization names"));
    }
    let suffix = assignment.organization_name_suffix.as_deref();
    if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
        let field = FieldValidation::valid(suffix);
        validation.organization_name_suffix =
            Some(field.with_info("Appended to assigned organization names"));
    }

    validation.valid = validation.assignment_type.valid
        && optional_valid(validation.claim_path.as_ref())
        && optional_valid(validation.organization_name.as_ref());
    Some(validation)
}

fn claim_path_field(spec: &ProviderSpec, path: &crate::registry::ClaimPathSpec) -> FieldValidation {
    let raw = path.display();
    let mut field = FieldValidation::valid(&raw);
    if let Err(e) = path.segments() {
        field.add_error(format!("Invalid claim path: {e}"));
        return field;
    }

    match spec.provider_type {
        ProviderType::OAuth2 => {
            if let Some(scopes) = spec.scope_param() {
                field.add_warning(format!(
                    "Ensure scopes '{scopes}' include permissions to access organization data \
                     from the provider"
                ));
            }
        }
        ProviderType::Oidc => field.add_warning(format!(
            "Ensure the OIDC provider includes organization/group information at claim path '{raw}'"
        )),
        _ => {}
    }
    field
}

fn optional_valid(field: Option<&FieldValidation>) -> bool {
    match field {
        Some(field) => field.valid,
        None => true,
    }
}

/// Fields that take part in the summary counts
fn counted_fields(result: &ProviderValidationResult) -> Vec<&FieldValidation> {
    let mut fields = vec![&result.client_id];
    if result.username_claim.value.is_some() {
        fields.push(&result.username_claim);
    }
    fields.extend(result.issuer.iter());

    if let Some(discovery) = &result.oidc_discovery {
        fields.extend([
            &discovery.discovery_url,
            &discovery.authorization_endpoint,
            &discovery.token_endpoint,
            &discovery.user_info_endpoint,
        ]);
        fields.extend(discovery.end_session_endpoint.iter());
    }
    if let Some(oauth2) = &result.oauth2_settings {
        fields.extend([
            &oauth2.authorization_endpoint,
            &oauth2.token_endpoint,
            &oauth2.user_info_endpoint,
            &oauth2.scopes,
        ]);
    }
    fields.extend(result.auth_url.iter());
    fields.extend(result.token_url.iter());

    if let Some(org) = &result.organization_assignment {
        fields.push(&org.assignment_type);
        fields.extend(org.claim_path.iter().filter(|f| f.is_reported()));
        fields.extend(org.organization_name.iter().filter(|f| f.is_reported()));
    }
    fields
}

/// Count the reported fields and decide the next steps
#[must_use]
pub fn build_summary(result: &ProviderValidationResult, provider_name: &str) -> ValidationSummary {
    let fields = counted_fields(result);
    let valid_fields = fields.iter().filter(|f| f.valid).count();
    let warning_fields = fields.iter().map(|f| f.warning_count()).sum();

    let mut summary = ValidationSummary {
        total_fields: fields.len(),
        valid_fields,
        error_fields: fields.len() - valid_fields,
        warning_fields,
        provider_name: Some(provider_name.to_string()).filter(|n| !n.is_empty()),
        next_steps: Vec::new(),
    };

    if summary.error_fields > 0 {
        summary.next_steps.push(format!(
            "Fix {} required field(s) marked with errors",
            summary.error_fields
        ));
    } else if summary.warning_fields > 0 {
        summary
            .next_steps
            .push("Configuration is valid but has warnings".to_string());
    } else {
        summary.next_steps.push("✓ All validations passed".to_string());
        summary
            .next_steps
            .push("✓ Configuration is ready to use".to_string());
    }
    summary
}
