//! Test fixtures providing pre-built test objects
//!
//! Registries over a static provider list, session cookies and an app
//! configuration wiring them into actix test services.

use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::web;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::Value;

use super::constants::{TEST_API_URL, TEST_BASE_UI_URL, TEST_COOKIE_NAME};
use crate::handlers::ValidationClient;
use crate::providers::ProviderContext;
use crate::registry::{AuthConfig, ProviderRegistry, ProviderSpec, StaticConfigSource};
use crate::session::{SessionCookies, TokenData};
use crate::settings::{ConfigSourceKind, GatewaySettings};

/// Unsigned JWT carrying `claims`; the signature segment is a placeholder
#[must_use]
pub fn jwt_with_claims(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signature = URL_SAFE_NO_PAD.encode(b"not-a-signature");
    format!("{header}.{payload}.{signature}")
}

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Settings using the static config source and plain-HTTP cookies
    #[must_use]
    pub fn settings() -> GatewaySettings {
        let mut settings = GatewaySettings::default();
        settings.application.base_ui_url = TEST_BASE_UI_URL.to_string();
        settings.api.api_url = TEST_API_URL.to_string();
        settings.auth.config_source = ConfigSourceKind::Static;
        settings.cookies.secure = false;
        settings.cookies.session_cookie_name = TEST_COOKIE_NAME.to_string();
        settings
    }

    #[must_use]
    pub fn session_cookies() -> SessionCookies {
        SessionCookies::new(TEST_COOKIE_NAME, false)
    }

    /// Session cookie as the browser would send it back
    ///
    /// # Panics
    ///
    /// Panics if the token cannot be encoded
    #[must_use]
    pub fn session_cookie(token: &TokenData) -> Cookie<'static> {
        Self::session_cookies()
            .create_session_cookie(token)
            .expect("session cookie should encode")
    }

    #[must_use]
    pub fn provider_context(api_url: &str) -> ProviderContext {
        ProviderContext {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            base_ui_url: TEST_BASE_UI_URL.to_string(),
            pkce_state_fallback: true,
        }
    }

    /// Registry serving `providers` from a static source
    #[must_use]
    pub fn registry(
        providers: Vec<ProviderSpec>,
        default_provider: Option<&str>,
    ) -> ProviderRegistry {
        Self::registry_with_api(providers, default_provider, TEST_API_URL)
    }

    /// Same as [`TestFixtures::registry`] with a custom backend API URL,
    /// usually a mock server validating bearer tokens
    #[must_use]
    pub fn registry_with_api(
        providers: Vec<ProviderSpec>,
        default_provider: Option<&str>,
        api_url: &str,
    ) -> ProviderRegistry {
        let source = StaticConfigSource::new(AuthConfig {
            providers,
            default_provider: default_provider.map(str::to_string),
            organizations_enabled: false,
        });
        ProviderRegistry::new(Arc::new(source), Self::provider_context(api_url))
    }

    /// App data every handler expects
    #[must_use]
    pub fn app_config(registry: ProviderRegistry) -> impl FnOnce(&mut web::ServiceConfig) {
        move |cfg| {
            cfg.app_data(web::Data::new(registry))
                .app_data(web::Data::new(Self::session_cookies()))
                .app_data(web::Data::new(ValidationClient::default()));
        }
    }
}
