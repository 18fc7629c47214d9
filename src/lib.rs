#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the authgate application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod claims;
pub mod error;
pub mod handlers;
pub mod models;
pub mod oauth;
pub mod providers;
pub mod registry;
pub mod session;
pub mod settings;
pub mod utils;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use error::GatewayError;
pub use handlers::configure_services;
pub use registry::ProviderRegistry;
pub use session::{SessionCookies, TokenData};
pub use settings::GatewaySettings;
