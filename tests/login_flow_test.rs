// Integration tests for the authorization-code login flow against a mock IdP
use actix_web::{http::StatusCode, test, App};
use authgate::handlers::configure_services;
use authgate::registry::{ProviderSpec, ProviderType};
use authgate::session::decode_token_data;
use authgate::testing::TestFixtures;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROVIDER: &str = "oidc-test";

async fn mock_idp() -> MockServer {
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
        })))
        .mount(&server)
        .await;
    server
}

fn oidc_spec(issuer: &str) -> ProviderSpec {
    let mut spec = ProviderSpec::new(PROVIDER, ProviderType::Oidc);
    spec.client_id = "authgate-ui".into();
    spec.issuer = Some(issuer.to_string());
    spec
}

#[actix_web::test]
async fn test_code_exchange_sets_session_cookie() {
    let server = mock_idp().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc"))
        .and(body_string_contains("code_verifier=v1"))
        .and(body_string_contains("client_id=authgate-ui"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "AT",
            "id_token": "IT",
            "expires_in": "120"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = TestFixtures::registry(vec![oidc_spec(&server.uri())], None);
    let app = test::init_service(
        App::new()
            .configure(TestFixtures::app_config(registry))
            .configure(configure_services),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/login?provider={PROVIDER}"))
        .set_json(json!({"code": "abc", "codeVerifier": "v1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "authgate_session")
        .expect("session cookie")
        .into_owned();
    let session = decode_token_data(cookie.value()).unwrap();
    assert_eq!(session.id_token, "IT");
    assert_eq!(session.access_token, "AT");
    assert_eq!(session.provider, PROVIDER);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"expiresIn": 120}));
}

#[actix_web::test]
async fn test_redirect_then_callback_round_trip() {
    let server = mock_idp().await;
    let registry = TestFixtures::registry(vec![oidc_spec(&server.uri())], None);
    let app = test::init_service(
        App::new()
            .configure(TestFixtures::app_config(registry))
            .configure(configure_services),
    )
    .await;

    // Step 1: the UI asks where to send the browser
    let req = test::TestRequest::get()
        .uri(&format!("/login?provider={PROVIDER}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let pkce_cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == format!("authgate_session_pkce_{PROVIDER}"))
        .expect("pkce cookie")
        .into_owned();
    let body: Value = test::read_body_json(resp).await;
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with(&format!("{}/auth?", server.uri())));
    assert!(url.contains("code_challenge_method=S256"));
    assert!(url.contains("client_id=authgate-ui"));

    // Step 2: the IdP redirected back with a code; the verifier comes from the cookie
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=from-idp"))
        .and(body_string_contains(format!("code_verifier={}", pkce_cookie.value())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "AT",
            "id_token": "IT",
            "refresh_token": "RT",
            "expires_in": 300
        })))
        .expect(1)
        .mount(&server)
        .await;

    let req = test::TestRequest::post()
        .uri(&format!("/login?provider={PROVIDER}"))
        .cookie(pkce_cookie)
        .set_json(json!({"code": "from-idp"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = resp
        .response()
        .cookies()
        .find(|c| c.name() == format!("authgate_session_pkce_{PROVIDER}"))
        .expect("pkce cookie cleared")
        .into_owned();
    assert_eq!(cleared.value(), "");
    let session_cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "authgate_session")
        .expect("session cookie")
        .into_owned();

    // Step 3: the new session answers userinfo
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", "Bearer AT"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"preferred_username": "ada"})),
        )
        .mount(&server)
        .await;

    let req = test::TestRequest::get()
        .uri("/userinfo")
        .cookie(session_cookie)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"username": "ada"}));
}

#[actix_web::test]
async fn test_token_endpoint_rejection_is_propagated() {
    let server = mock_idp().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let registry = TestFixtures::registry(vec![oidc_spec(&server.uri())], None);
    let app = test::init_service(
        App::new()
            .configure(TestFixtures::app_config(registry))
            .configure(configure_services),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/login?provider={PROVIDER}"))
        .set_json(json!({"code": "stale", "codeVerifier": "v1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp
        .response()
        .cookies()
        .all(|c| c.name() != "authgate_session"));
}

#[actix_web::test]
async fn test_disabled_provider_cannot_log_in() {
    let mut spec = oidc_spec("https://sso.example.com");
    spec.enabled = false;
    let registry = TestFixtures::registry(vec![spec], None);
    let app = test::init_service(
        App::new()
            .configure(TestFixtures::app_config(registry))
            .configure(configure_services),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/login?provider={PROVIDER}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_failed_discovery_is_not_reported_as_unknown_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let registry = TestFixtures::registry(vec![oidc_spec(&server.uri())], None);
    let app = test::init_service(
        App::new()
            .configure(TestFixtures::app_config(registry))
            .configure(configure_services),
    )
    .await;

    for req in [
        test::TestRequest::get()
            .uri(&format!("/login?provider={PROVIDER}"))
            .to_request(),
        test::TestRequest::post()
            .uri(&format!("/login?provider={PROVIDER}"))
            .set_json(json!({"code": "abc", "codeVerifier": "v1"}))
            .to_request(),
    ] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "upstream_error");
    }
}
