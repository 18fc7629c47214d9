//! HTTP response handling
//!
//! A single place for building the JSON bodies the gateway returns. Error bodies
//! always have the shape `{"error": <code>, "message": <text>}` so the UI can
//! branch on the code without parsing prose.

use actix_web::{
    cookie::Cookie,
    http::{header, StatusCode},
    HttpResponse, HttpResponseBuilder,
};
use serde_json::{json, Value};

/// Header value instructing browsers to drop every cookie for this origin
pub const CLEAR_SITE_DATA_COOKIES: &str = "\"cookies\"";

/// Header name for [`CLEAR_SITE_DATA_COOKIES`]
pub const CLEAR_SITE_DATA: &str = "Clear-Site-Data";

// ===============================
// CACHED RESPONSES
// ===============================

/// Pre-serialized bodies for the errors returned on every stale session
static CACHED_RESPONSES: std::sync::LazyLock<CachedResponses> =
    std::sync::LazyLock::new(CachedResponses::new);

struct CachedResponses {
    unauthorized: String,
    server_error: String,
    invalid_request: String,
}

impl CachedResponses {
    fn new() -> Self {
        Self {
            unauthorized: Self::create_json(
                "unauthorized",
                "Authentication is required to access this resource",
            ),
            server_error: Self::create_json("server_error", "An internal server error occurred"),
            invalid_request: Self::create_json(
                "invalid_request",
                "The request is malformed or invalid",
            ),
        }
    }

    fn create_json(error: &str, message: &str) -> String {
        json!({ "error": error, "message": message }).to_string()
    }

    fn body_for(&self, status: StatusCode) -> Option<&str> {
        match status {
            StatusCode::UNAUTHORIZED => Some(&self.unauthorized),
            StatusCode::INTERNAL_SERVER_ERROR => Some(&self.server_error),
            StatusCode::BAD_REQUEST => Some(&self.invalid_request),
            _ => None,
        }
    }
}

/// Unified response builder
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Start an error response with the given status
    #[must_use]
    pub fn error(status: StatusCode) -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(status)
    }

    /// `400 Bad Request`
    #[must_use]
    pub fn bad_request() -> ErrorResponseBuilder {
        Self::error(StatusCode::BAD_REQUEST)
    }

    /// `401 Unauthorized`
    #[must_use]
    pub fn unauthorized() -> ErrorResponseBuilder {
        Self::error(StatusCode::UNAUTHORIZED)
    }

    /// `500 Internal Server Error`
    #[must_use]
    pub fn internal_server_error() -> ErrorResponseBuilder {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// `200 OK` with a JSON body
    #[must_use]
    pub fn ok() -> JsonResponseBuilder {
        JsonResponseBuilder::new(StatusCode::OK)
    }

    /// Missing required field in the request body
    #[must_use]
    pub fn missing_field(field_name: &str) -> HttpResponse {
        Self::bad_request()
            .with_error_code("missing_field")
            .with_message(&format!("Missing required field: {field_name}"))
            .build()
    }
}

// ===============================
// BUILDER TYPES
// ===============================

/// Builder for error responses with fluent interface
pub struct ErrorResponseBuilder {
    status: StatusCode,
    error_code: Option<String>,
    message: Option<String>,
    cookies: Vec<Cookie<'static>>,
    clear_site_data: bool,
}

impl ErrorResponseBuilder {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            error_code: None,
            message: None,
            cookies: Vec::new(),
            clear_site_data: false,
        }
    }

    /// Set a custom error code (e.g. "`provider_not_found`")
    #[must_use]
    pub fn with_error_code(mut self, code: &str) -> Self {
        self.error_code = Some(code.to_string());
        self
    }

    /// Set a custom error message
    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn with_cookies(mut self, mut cookies: Vec<Cookie<'static>>) -> Self {
        self.cookies.append(&mut cookies);
        self
    }

    /// Add `Clear-Site-Data: "cookies"`
    #[must_use]
    pub fn clear_site_data(mut self) -> Self {
        self.clear_site_data = true;
        self
    }

    /// Build the final `HttpResponse`
    #[must_use]
    pub fn build(self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status);
        builder.insert_header((header::CONTENT_TYPE, "application/json"));
        if self.clear_site_data {
            builder.insert_header((CLEAR_SITE_DATA, CLEAR_SITE_DATA_COOKIES));
        }
        for cookie in self.cookies {
            builder.cookie(cookie);
        }

        if self.error_code.is_none() && self.message.is_none() {
            if let Some(body) = CACHED_RESPONSES.body_for(self.status) {
                return builder.body(body.to_owned());
            }
        }

        let error_code = self
            .error_code
            .unwrap_or_else(|| default_error_code(self.status).to_string());
        let message = self.message.unwrap_or_else(|| {
            self.status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

        builder.body(json!({ "error": error_code, "message": message }).to_string())
    }
}

fn default_error_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "invalid_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::IM_A_TEAPOT => "auth_disabled",
        _ if status.is_server_error() => "server_error",
        _ => "request_failed",
    }
}

/// Builder for JSON success responses
pub struct JsonResponseBuilder {
    status: StatusCode,
    cookies: Vec<Cookie<'static>>,
    headers: Vec<(&'static str, String)>,
}

impl JsonResponseBuilder {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            cookies: Vec::new(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn with_cookies(mut self, mut cookies: Vec<Cookie<'static>>) -> Self {
        self.cookies.append(&mut cookies);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    /// Build the response with JSON content
    #[must_use]
    pub fn json<T: serde::Serialize>(self, data: &T) -> HttpResponse {
        let mut builder: HttpResponseBuilder = HttpResponse::build(self.status);
        for (name, value) in self.headers {
            builder.insert_header((name, value));
        }
        for cookie in self.cookies {
            builder.cookie(cookie);
        }
        builder.json(data)
    }
}

/// Shorthand for `{"status": "ok"}`
#[must_use]
pub fn status_ok() -> Value {
    json!({ "status": "ok" })
}
