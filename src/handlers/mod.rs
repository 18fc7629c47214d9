//! HTTP request handlers
//!
//! Thin orchestration over the registry, the providers and the session cookie.
//! Every handler resolves its provider afresh from the current configuration.

pub mod login;
pub mod providers;
pub mod session;
pub mod test_connection;
pub mod token_login;

pub use login::{login, login_redirect};
pub use providers::{health, list_providers};
pub use session::{logout, refresh, userinfo};
pub use test_connection::{test_provider, ValidationClient};
pub use token_login::token_login;

use actix_web::{
    cookie::Cookie, error::InternalError, web, HttpRequest, HttpResponse, ResponseError,
};

use crate::error::GatewayError;
use crate::models::ExpiresInResponse;
use crate::oauth::TokenExchange;
use crate::providers::ProviderVariant;
use crate::registry::ProviderRegistry;
use crate::session::{SessionCookies, TokenData};
use crate::utils::responses::ErrorResponseBuilder;
use crate::utils::ResponseBuilder;

/// Register the gateway routes
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let response = ResponseBuilder::bad_request()
            .with_error_code("invalid_request")
            .with_message(&err.to_string())
            .build();
        InternalError::from_response(err, response).into()
    }))
    // Login endpoints
    .route("/login", web::get().to(login_redirect))
    .route("/login", web::post().to(login))
    .route("/login/token", web::post().to(token_login))
    // Session endpoints
    .route("/refresh", web::post().to(refresh))
    .route("/userinfo", web::get().to(userinfo))
    .route("/logout", web::post().to(logout))
    // Provider endpoints
    .route("/authproviders", web::get().to(list_providers))
    .route("/authproviders/{name}/test", web::post().to(test_provider))
    // Health endpoint
    .route("/ping", web::get().to(health));
}

/// Error response builder carrying the status, code and message of `err`
pub(crate) fn rejection(err: &GatewayError) -> ErrorResponseBuilder {
    ResponseBuilder::error(err.status_code())
        .with_error_code(err.error_code())
        .with_message(&err.to_string())
}

/// Error response for routes that do not own a session; the cookie is left alone
pub(crate) fn reject(err: &GatewayError) -> HttpResponse {
    rejection(err).build()
}

/// Error response for session-bound routes: when the failure means the
/// session is unusable the cookie is expired and `Clear-Site-Data` is sent
pub(crate) fn session_error(err: &GatewayError, cookies: &SessionCookies) -> HttpResponse {
    let builder = rejection(err);
    if err.clears_session() {
        builder
            .with_cookie(cookies.expired_session_cookie())
            .clear_site_data()
            .build()
    } else {
        builder.build()
    }
}

/// Store the exchanged tokens in the session cookie and answer `{expiresIn}`
pub(crate) fn respond_with_token(
    cookies: &SessionCookies,
    exchange: &TokenExchange,
    extra_cookies: Vec<Cookie<'static>>,
) -> HttpResponse {
    match cookies.create_session_cookie(&exchange.token) {
        Ok(cookie) => ResponseBuilder::ok()
            .with_cookie(cookie)
            .with_cookies(extra_cookies)
            .json(&ExpiresInResponse {
                expires_in: exchange.expires_in,
            }),
        Err(e) => {
            log::error!("Failed to encode session cookie: {e}");
            ResponseBuilder::internal_server_error()
                .with_cookies(extra_cookies)
                .build()
        }
    }
}

/// Decode the session cookie and resolve the provider that issued it.
///
/// A session without a provider name belongs to the default provider.
///
/// # Errors
///
/// Returns `GatewayError::Session` when there is no usable session, or any
/// resolution error of the registry
pub(crate) async fn session_provider(
    req: &HttpRequest,
    registry: &ProviderRegistry,
    cookies: &SessionCookies,
) -> Result<(ProviderVariant, TokenData), GatewayError> {
    let session = cookies.read_session(req)?;
    if session.is_empty() {
        return Err(GatewayError::Session("no session".to_string()));
    }
    let variant = registry.resolve(&session.provider).await?;
    Ok((variant, session))
}
