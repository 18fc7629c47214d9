// Centralized logging for the login lifecycle, so every handler reports it the same way
use log::{debug, info, warn};

use crate::error::GatewayError;
use crate::utils::secrets::sanitize_url;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log an incoming login request
    pub fn log_login_request(method: &str, provider: &str) {
        let provider = if provider.is_empty() { "(default)" } else { provider };
        info!("Login request: method={method}, provider={provider}");
    }

    /// Log the authorization URL handed to the browser, without its query
    pub fn log_login_redirect(provider: &str, url: &str) {
        info!(
            "🔍 Returning login redirect for provider '{provider}': {}",
            sanitize_url(url)
        );
    }

    /// Log where the PKCE verifier for a code exchange came from
    pub fn log_verifier_source(provider: &str, source: &str) {
        debug!("PKCE verifier for provider '{provider}' taken from {source}");
    }

    /// Log a successful token exchange or refresh
    pub fn log_token_issued(provider: &str, grant: &str, expires_in: Option<i64>) {
        match expires_in {
            Some(seconds) => info!(
                "✅ {grant} for provider '{provider}' succeeded, session expires in {seconds}s"
            ),
            None => info!("✅ {grant} for provider '{provider}' succeeded, no expiry reported"),
        }
    }

    /// Log a failed token exchange or refresh
    pub fn log_token_failure(provider: &str, grant: &str, err: &GatewayError) {
        warn!("❌ {grant} for provider '{provider}' failed: {err}");
    }

    /// Log a request whose session could not be used
    pub fn log_session_rejected(route: &str, err: &GatewayError) {
        warn!("{route}: rejecting session and clearing cookie: {err}");
    }

    /// Log the end of a session
    pub fn log_logout(provider: &str, redirect: Option<&str>) {
        match redirect {
            Some(url) => info!(
                "User logged out of provider '{provider}', IdP logout at {}",
                sanitize_url(url)
            ),
            None => info!("User logged out of provider '{provider}'"),
        }
    }

    /// Log a provider configuration test request
    pub fn log_configuration_test(provider: &str, valid: bool, errors: usize, warnings: usize) {
        info!(
            "🔧 Configuration test of provider '{provider}': valid={valid}, \
             errors={errors}, warnings={warnings}"
        );
    }
}
