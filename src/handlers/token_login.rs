// Direct bearer-token login for the Kubernetes token provider
use actix_web::{web, HttpResponse, Result};

use super::{reject, respond_with_token, session_error};
use crate::models::TokenLoginParameters;
use crate::registry::{ProviderRegistry, ProviderType};
use crate::session::SessionCookies;
use crate::utils::{LoggingHelper, ResponseBuilder};

fn unsupported_provider(name: &str) -> HttpResponse {
    ResponseBuilder::bad_request()
        .with_error_code("unsupported_provider")
        .with_message(&format!("Provider '{name}' does not support token login"))
        .build()
}

/// `POST /login/token` with `{token, provider}`
///
/// # Errors
/// Never fails at the actix level; `400` for missing fields or a provider
/// without token auth, `401` when the backend rejects the token, `500` when
/// the backend cannot be reached or fails
pub async fn token_login(
    body: web::Json<TokenLoginParameters>,
    registry: web::Data<ProviderRegistry>,
    cookies: web::Data<SessionCookies>,
) -> Result<HttpResponse> {
    let params = body.into_inner();
    let token = params.token.trim();
    if token.is_empty() {
        return Ok(ResponseBuilder::missing_field("token"));
    }
    if params.provider.is_empty() {
        return Ok(ResponseBuilder::missing_field("provider"));
    }
    LoggingHelper::log_login_request("POST token", &params.provider);

    let resolved = match registry.spec(&params.provider).await {
        Ok(resolved) => resolved,
        Err(e) => {
            log::warn!("Provider not available for token login: {e}");
            return Ok(reject(&e));
        }
    };
    // only plain token providers; checked before building so no IdP is contacted
    if resolved.spec.provider_type != ProviderType::K8s || resolved.spec.is_openshift_oauth() {
        return Ok(unsupported_provider(&params.provider));
    }
    let variant = match registry.build(&resolved).await {
        Ok(variant) => variant,
        Err(e) => return Ok(reject(&e)),
    };
    let Some(provider) = variant.as_token_provider() else {
        return Ok(unsupported_provider(&params.provider));
    };

    match provider.validate_token(token).await {
        Ok(exchange) => {
            let exchange = exchange.for_provider(&params.provider);
            LoggingHelper::log_token_issued(&params.provider, "Token login", exchange.expires_in);
            Ok(respond_with_token(&cookies, &exchange, Vec::new()))
        }
        Err(e) => {
            LoggingHelper::log_token_failure(&params.provider, "Token login", &e);
            Ok(session_error(&e, &cookies))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::configure_services;
    use crate::registry::ProviderSpec;
    use crate::testing::fixtures::{jwt_with_claims, TestFixtures};
    use crate::utils::responses::CLEAR_SITE_DATA;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/fleets"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    fn providers() -> Vec<ProviderSpec> {
        let mut sso = ProviderSpec::new("sso", ProviderType::Oidc);
        sso.client_id = "ui".into();
        sso.issuer = Some("https://sso.example.com".into());
        vec![ProviderSpec::new("k8s", ProviderType::K8s), sso]
    }

    #[actix_web::test]
    async fn test_token_login_sets_session() {
        let server = backend(200).await;
        let registry = TestFixtures::registry_with_api(providers(), None, &server.uri());
        let app = test::init_service(
            App::new()
                .configure(TestFixtures::app_config(registry))
                .configure(configure_services),
        )
        .await;

        let token = jwt_with_claims(&json!({
            "sub": "system:serviceaccount:ns:robot",
            "exp": 4_102_444_800_i64
        }));
        let req = test::TestRequest::post()
            .uri("/login/token")
            .set_json(json!({"token": format!(" {token} "), "provider": "k8s"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == "authgate_session")
            .expect("session cookie")
            .into_owned();
        let session = crate::session::decode_token_data(cookie.value()).unwrap();
        assert_eq!(session.id_token, token);
        assert_eq!(session.provider, "k8s");

        let body: Value = test::read_body_json(resp).await;
        assert!(body["expiresIn"].as_i64().unwrap() > 0);
    }

    #[actix_web::test]
    async fn test_token_login_rejected_token() {
        let server = backend(401).await;
        let registry = TestFixtures::registry_with_api(providers(), None, &server.uri());
        let app = test::init_service(
            App::new()
                .configure(TestFixtures::app_config(registry))
                .configure(configure_services),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/login/token")
            .set_json(json!({"token": "opaque", "provider": "k8s"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().get(CLEAR_SITE_DATA).is_some());
    }

    #[actix_web::test]
    async fn test_token_login_backend_failure_is_500() {
        let server = backend(503).await;
        let registry = TestFixtures::registry_with_api(providers(), None, &server.uri());
        let app = test::init_service(
            App::new()
                .configure(TestFixtures::app_config(registry))
                .configure(configure_services),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/login/token")
            .set_json(json!({"token": "opaque", "provider": "k8s"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.headers().get(CLEAR_SITE_DATA).is_none());
        assert!(resp.response().cookies().all(|c| c.name() != "authgate_session"));
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "upstream_error");
    }

    #[actix_web::test]
    async fn test_token_login_backend_unreachable_is_500() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let closed = format!("http://127.0.0.1:{port}");
        let registry = TestFixtures::registry_with_api(providers(), None, &closed);
        let app = test::init_service(
            App::new()
                .configure(TestFixtures::app_config(registry))
                .configure(configure_services),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/login/token")
            .set_json(json!({"token": "opaque", "provider": "k8s"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.response().cookies().all(|c| c.name() != "authgate_session"));
    }

    #[actix_web::test]
    async fn test_token_login_bad_requests() {
        let registry = TestFixtures::registry(providers(), None);
        let app = test::init_service(
            App::new()
                .configure(TestFixtures::app_config(registry))
                .configure(configure_services),
        )
        .await;

        for body in [
            json!({"provider": "k8s"}),
            json!({"token": "t"}),
            json!({"token": "t", "provider": "sso"}),
        ] {
            let req = test::TestRequest::post()
                .uri("/login/token")
                .set_json(&body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
        }
    }
}
