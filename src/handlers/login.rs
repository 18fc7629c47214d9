// Login handlers: issue the authorization redirect and complete the code exchange
use actix_web::{web, HttpRequest, HttpResponse, Result};

use super::{reject, rejection, respond_with_token};
use crate::models::{LoginParameters, ProviderQuery, RedirectResponse};
use crate::oauth::{OAuthState, PkceChallenge};
use crate::registry::ProviderRegistry;
use crate::session::SessionCookies;
use crate::utils::{LoggingHelper, ResponseBuilder};

/// `GET /login?provider=<name>`
///
/// Answers `{url}` with the authorization URL and stores the PKCE verifier in
/// a short-lived cookie scoped to the provider.
///
/// # Errors
/// Never fails at the actix level; resolution and configuration errors are
/// rendered as JSON error responses
pub async fn login_redirect(
    query: web::Query<ProviderQuery>,
    registry: web::Data<ProviderRegistry>,
    cookies: web::Data<SessionCookies>,
) -> Result<HttpResponse> {
    let requested = query.provider.as_deref().unwrap_or_default();
    LoggingHelper::log_login_request("GET", requested);

    let variant = match registry.resolve(requested).await {
        Ok(variant) => variant,
        Err(e) => {
            log::warn!("Provider not available for login: {e}");
            return Ok(reject(&e));
        }
    };
    let provider = variant.as_provider();

    let pkce = PkceChallenge::generate();
    let url = match provider.login_redirect_url(&pkce) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("Cannot build login redirect for '{}': {e}", provider.name());
            return Ok(reject(&e));
        }
    };
    LoggingHelper::log_login_redirect(provider.name(), &url);

    Ok(ResponseBuilder::ok()
        .with_cookie(cookies.create_pkce_cookie(provider.name(), &pkce.code_verifier))
        .json(&RedirectResponse { url: Some(url) }))
}

/// `POST /login?provider=<name>` with `{code, codeVerifier?, state?}`
///
/// The provider comes from the query, else from the returned `state`. The
/// verifier comes from the body, else the PKCE cookie, else the `state`
/// suffix. The PKCE cookie is cleared whatever the outcome.
///
/// # Errors
/// Never fails at the actix level; exchange failures are rendered as JSON
/// error responses
pub async fn login(
    req: HttpRequest,
    query: web::Query<ProviderQuery>,
    body: web::Json<LoginParameters>,
    registry: web::Data<ProviderRegistry>,
    cookies: web::Data<SessionCookies>,
) -> Result<HttpResponse> {
    let mut params = body.into_inner();
    let state = params.state.as_deref().and_then(OAuthState::parse);

    let requested = query
        .provider
        .clone()
        .filter(|p| !p.is_empty())
        .or_else(|| state.as_ref().map(|s| s.provider.clone()))
        .unwrap_or_default();
    LoggingHelper::log_login_request("POST", &requested);

    let variant = match registry.resolve(&requested).await {
        Ok(variant) => variant,
        Err(e) => {
            log::warn!("Provider not available for login: {e}");
            return Ok(reject(&e));
        }
    };
    let provider = variant.as_provider();
    let name = provider.name();
    let clear_pkce = cookies.expired_pkce_cookie(name);

    if params.verifier().is_empty() {
        if let Some(verifier) = cookies.read_pkce_verifier(&req, name) {
            LoggingHelper::log_verifier_source(name, "cookie");
            params.code_verifier = Some(verifier);
        } else if let Some(verifier) = state.and_then(|s| s.code_verifier) {
            LoggingHelper::log_verifier_source(name, "state");
            params.code_verifier = Some(verifier);
        }
    }

    match provider.get_token(&params).await {
        Ok(exchange) => {
            let exchange = exchange.for_provider(name);
            LoggingHelper::log_token_issued(name, "Token exchange", exchange.expires_in);
            Ok(respond_with_token(&cookies, &exchange, vec![clear_pkce]))
        }
        Err(e) => {
            LoggingHelper::log_token_failure(name, "Token exchange", &e);
            Ok(rejection(&e).with_cookie(clear_pkce).build())
        }
    }
}
