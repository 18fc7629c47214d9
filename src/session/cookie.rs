use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    HttpRequest,
};

use super::{decode_token_data, encode_token_data, TokenData};
use crate::error::GatewayError;
use crate::settings::CookieSettings;

/// Lifetime of the PKCE verifier cookie set alongside a login redirect
pub const PKCE_COOKIE_TTL_MINUTES: i64 = 10;

/// Options for cookie creation
pub struct CookieOptions {
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
    /// `None` produces a browser-session cookie
    pub max_age: Option<Duration>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            same_site: SameSite::Strict,
            path: "/".to_string(),
            max_age: None,
        }
    }
}

/// Builds, reads and clears the session and PKCE cookies
///
/// All cookies share the same attributes: `HttpOnly`, `SameSite=Strict`,
/// `Path=/`, and `Secure` when the gateway is served over TLS.
#[derive(Clone, Debug)]
pub struct SessionCookies {
    cookie_name: String,
    secure: bool,
}

impl SessionCookies {
    #[must_use]
    pub fn new(cookie_name: &str, secure: bool) -> Self {
        Self {
            cookie_name: cookie_name.to_string(),
            secure,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &CookieSettings) -> Self {
        Self::new(&settings.session_cookie_name, settings.secure)
    }

    #[must_use]
    pub fn session_cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Name of the PKCE verifier cookie for one provider
    #[must_use]
    pub fn pkce_cookie_name(&self, provider: &str) -> String {
        format!("{}_pkce_{provider}", self.cookie_name)
    }

    fn create_cookie(
        &self,
        name: String,
        value: String,
        options: CookieOptions,
    ) -> Cookie<'static> {
        let mut cookie = Cookie::build(name, value)
            .http_only(options.http_only)
            .secure(self.secure)
            .same_site(options.same_site)
            .path(options.path)
            .finish();
        if let Some(max_age) = options.max_age {
            cookie.set_max_age(max_age);
        }
        cookie
    }

    /// Create the session cookie carrying `token`
    ///
    /// # Errors
    ///
    /// Returns an error if the token data cannot be serialized
    pub fn create_session_cookie(
        &self,
        token: &TokenData,
    ) -> Result<Cookie<'static>, GatewayError> {
        let value = encode_token_data(token)?;
        Ok(self.create_cookie(self.cookie_name.clone(), value, CookieOptions::default()))
    }

    /// Create the short-lived cookie holding a PKCE verifier
    #[must_use]
    pub fn create_pkce_cookie(&self, provider: &str, verifier: &str) -> Cookie<'static> {
        let cookie = self.create_cookie(
            self.pkce_cookie_name(provider),
            verifier.to_string(),
            CookieOptions {
                max_age: Some(Duration::minutes(PKCE_COOKIE_TTL_MINUTES)),
                ..Default::default()
            },
        );

        log::debug!(
            "Creating PKCE cookie: secure={}, name={}",
            self.secure,
            cookie.name()
        );
        cookie
    }

    #[must_use]
    pub fn expired_session_cookie(&self) -> Cookie<'static> {
        create_expired_cookie(&self.cookie_name, self.secure)
    }

    #[must_use]
    pub fn expired_pkce_cookie(&self, provider: &str) -> Cookie<'static> {
        create_expired_cookie(&self.pkce_cookie_name(provider), self.secure)
    }

    /// Read the session from the request.
    ///
    /// A missing cookie is not an error: it yields an empty `TokenData`.
    ///
    /// # Errors
    ///
    /// Returns a session error if the cookie is present but cannot be decoded
    pub fn read_session(&self, req: &HttpRequest) -> Result<TokenData, GatewayError> {
        match req.cookie(&self.cookie_name) {
            Some(cookie) => decode_token_data(cookie.value()),
            None => Ok(TokenData::default()),
        }
    }

    /// PKCE verifier stored for `provider`, if the cookie is present and non-empty
    #[must_use]
    pub fn read_pkce_verifier(&self, req: &HttpRequest, provider: &str) -> Option<String> {
        req.cookie(&self.pkce_cookie_name(provider))
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }
}

/// Create an expired cookie to clear a specific cookie
#[must_use]
pub fn create_expired_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(name.to_owned(), "")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(Duration::seconds(-1))
        .finish()
}
