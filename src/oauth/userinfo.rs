//! Userinfo lookups against an IdP

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::error::{GatewayError, ProtocolError, UpstreamError};
use crate::utils::secrets::sanitize_url;

const X_FORWARDED_HOST: &str = "X-Forwarded-Host";
const X_FORWARDED_PROTO: &str = "X-Forwarded-Proto";

/// `GET` a userinfo endpoint with `token` as bearer credentials.
///
/// `forwarded_from` is the public URL of the IdP; its host and scheme are sent
/// as `X-Forwarded-Host`/`X-Forwarded-Proto` so an IdP reached over an internal
/// address still answers with its public identity.
///
/// # Errors
///
/// - `UpstreamError::UserInfoStatus` carrying the upstream code for anything but 200
/// - `ProtocolError::MalformedResponse` when the body is not JSON
pub async fn fetch_userinfo(
    client: &reqwest::Client,
    endpoint: &str,
    token: &str,
    forwarded_from: Option<&str>,
) -> Result<Value, GatewayError> {
    let mut request = client
        .get(endpoint)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(ACCEPT, "application/json");

    if let Some(public) = forwarded_from.and_then(|raw| Url::parse(raw).ok()) {
        if let Some(host) = forwarded_host(&public) {
            request = request
                .header(X_FORWARDED_HOST, host)
                .header(X_FORWARDED_PROTO, public.scheme());
        }
    }

    let response = request.send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        log::warn!(
            "Userinfo endpoint {} returned {status}",
            sanitize_url(endpoint)
        );
        return Err(UpstreamError::UserInfoStatus(status.as_u16()).into());
    }

    let body = response
        .text()
        .await
        .map_err(|e| UpstreamError::Body(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| {
        ProtocolError::MalformedResponse(format!("userinfo response is not JSON: {e}")).into()
    })
}

/// `host[:port]` of a URL, as a `Host` header would carry it
fn forwarded_host(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_host_keeps_explicit_port() {
        let url = Url::parse("https://sso.example.com:8443/realms/main").unwrap();
        assert_eq!(forwarded_host(&url).as_deref(), Some("sso.example.com:8443"));

        let url = Url::parse("https://sso.example.com/realms/main").unwrap();
        assert_eq!(forwarded_host(&url).as_deref(), Some("sso.example.com"));
    }
}
