//! Shared testing utilities
//!
//! Compiled for unit tests and, with the `testing` feature, for the
//! integration tests under `tests/`.
//!
//! ```rust,ignore
//! use authgate::testing::{jwt_with_claims, TestFixtures};
//!
//! let registry = TestFixtures::registry(vec![], None);
//! let app = App::new()
//!     .configure(TestFixtures::app_config(registry))
//!     .configure(configure_services);
//! ```

pub mod fixtures;

pub use fixtures::{jwt_with_claims, TestFixtures};

/// Common test constants
pub mod constants {
    /// Session cookie name used by the fixtures
    pub const TEST_COOKIE_NAME: &str = "authgate_session";

    /// Public UI URL; callbacks land on `{TEST_BASE_UI_URL}/callback`
    pub const TEST_BASE_UI_URL: &str = "http://localhost:9000";

    /// Backend API URL for registries that never validate bearer tokens
    pub const TEST_API_URL: &str = "http://localhost:3443";
}
