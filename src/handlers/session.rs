// Session handlers: refresh, userinfo and logout for an established session
use actix_web::{web, HttpRequest, HttpResponse, Result};

use super::{respond_with_token, session_error, session_provider};
use crate::error::GatewayError;
use crate::models::{RedirectResponse, UserInfoResponse};
use crate::registry::ProviderRegistry;
use crate::session::SessionCookies;
use crate::utils::responses::{CLEAR_SITE_DATA, CLEAR_SITE_DATA_COOKIES};
use crate::utils::{LoggingHelper, ResponseBuilder};

/// 401 for a session whose provider cannot be resolved, whatever the reason
fn unresolvable_session(route: &str, err: &GatewayError, cookies: &SessionCookies) -> HttpResponse {
    LoggingHelper::log_session_rejected(route, err);
    ResponseBuilder::unauthorized()
        .with_error_code(err.error_code())
        .with_message(&err.to_string())
        .with_cookie(cookies.expired_session_cookie())
        .clear_site_data()
        .build()
}

/// `POST /refresh`
///
/// Exchanges the session's refresh token and replaces the cookie.
///
/// # Errors
/// Never fails at the actix level
pub async fn refresh(
    req: HttpRequest,
    registry: web::Data<ProviderRegistry>,
    cookies: web::Data<SessionCookies>,
) -> Result<HttpResponse> {
    let (variant, session) = match session_provider(&req, &registry, &cookies).await {
        Ok(resolved) => resolved,
        Err(e) => return Ok(unresolvable_session("Refresh", &e, &cookies)),
    };
    let provider = variant.as_provider();

    match provider.refresh_token(&session.refresh_token).await {
        Ok(exchange) => {
            let exchange = exchange.for_provider(provider.name());
            LoggingHelper::log_token_issued(provider.name(), "Token refresh", exchange.expires_in);
            Ok(respond_with_token(&cookies, &exchange, Vec::new()))
        }
        Err(e) => {
            LoggingHelper::log_token_failure(provider.name(), "Token refresh", &e);
            Ok(session_error(&e, &cookies))
        }
    }
}

/// `GET /userinfo`
///
/// # Errors
/// Never fails at the actix level
pub async fn userinfo(
    req: HttpRequest,
    registry: web::Data<ProviderRegistry>,
    cookies: web::Data<SessionCookies>,
) -> Result<HttpResponse> {
    let (variant, session) = match session_provider(&req, &registry, &cookies).await {
        Ok(resolved) => resolved,
        Err(e) => return Ok(unresolvable_session("UserInfo", &e, &cookies)),
    };
    let provider = variant.as_provider();
    log::debug!("UserInfo: resolving username with provider '{}'", provider.name());

    match provider.get_user_info(&session).await {
        Ok(username) => {
            log::info!("UserInfo: resolved username for provider '{}'", provider.name());
            Ok(ResponseBuilder::ok().json(&UserInfoResponse { username }))
        }
        Err(e) => {
            log::warn!("UserInfo: provider '{}' failed: {e}", provider.name());
            Ok(session_error(&e, &cookies))
        }
    }
}

/// `POST /logout`
///
/// Best effort at the IdP; the local session is always cleared and the
/// response is always `200`.
///
/// # Errors
/// Never fails at the actix level
pub async fn logout(
    req: HttpRequest,
    registry: web::Data<ProviderRegistry>,
    cookies: web::Data<SessionCookies>,
) -> Result<HttpResponse> {
    let url = match session_provider(&req, &registry, &cookies).await {
        Ok((variant, session)) => {
            let provider = variant.as_provider();
            match provider.logout(&session).await {
                Ok(url) => {
                    LoggingHelper::log_logout(provider.name(), url.as_deref());
                    url
                }
                Err(e) => {
                    log::warn!("Logout at provider '{}' failed: {e}", provider.name());
                    None
                }
            }
        }
        Err(e) => {
            log::warn!("Logout: no usable session, clearing cookie only: {e}");
            None
        }
    };

    Ok(ResponseBuilder::ok()
        .with_cookie(cookies.expired_session_cookie())
        .with_header(CLEAR_SITE_DATA, CLEAR_SITE_DATA_COOKIES)
        .json(&RedirectResponse { url }))
}
