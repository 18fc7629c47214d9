// Provider listing and health endpoints
use actix_web::{web, HttpResponse, Result};

use super::reject;
use crate::registry::ProviderRegistry;
use crate::utils::responses::status_ok;
use crate::utils::ResponseBuilder;

/// `GET /authproviders`: public information on the enabled providers
///
/// # Errors
/// Never fails at the actix level
pub async fn list_providers(registry: web::Data<ProviderRegistry>) -> Result<HttpResponse> {
    match registry.list().await {
        Ok(providers) => Ok(ResponseBuilder::ok().json(&providers)),
        Err(e) => {
            log::warn!("Cannot list providers: {e}");
            Ok(reject(&e))
        }
    }
}

/// Health check endpoint
///
/// # Errors
/// Never fails
pub async fn health() -> Result<HttpResponse> {
    Ok(ResponseBuilder::ok().json(&status_ok()))
}
