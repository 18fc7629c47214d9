#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use authgate::{
    handlers::{configure_services, ValidationClient},
    registry::ProviderRegistry,
    session::SessionCookies,
    settings::{ConfigSourceKind, GatewaySettings},
    VERSION,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = GatewaySettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    let http = reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()
        .map_err(|e| std::io::Error::other(format!("Failed to build HTTP client: {e}")))?;
    let validation = ValidationClient::with_timeout(settings.validation_timeout())
        .map_err(|e| std::io::Error::other(format!("Failed to build validation client: {e}")))?;

    start_server(settings, http, validation).await
}

/// Start the gateway
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(
    settings: GatewaySettings,
    http: reqwest::Client,
    validation: ValidationClient,
) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    let registry = web::Data::new(ProviderRegistry::from_settings(&settings, http));
    let cookies = web::Data::new(SessionCookies::from_settings(&settings.cookies));
    let validation = web::Data::new(validation);

    // Configure CORS for the UI
    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(registry.clone())
            .app_data(cookies.clone())
            .app_data(validation.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &GatewaySettings) {
    println!("Starting authgate {VERSION} on http://{bind_address}");
    match settings.auth.config_source {
        ConfigSourceKind::Api => println!(
            "Provider configuration: {}/api/v1/auth/config",
            settings.api.api_url.trim_end_matches('/')
        ),
        ConfigSourceKind::Static => println!(
            "Provider configuration: {} static provider(s) from settings",
            settings.providers.len()
        ),
    }
    println!("Log level: {}", settings.logging.level);
    println!();
    println!("Login endpoints:");
    println!("  GET  /login?provider=NAME    - Authorization URL for a provider");
    println!("  POST /login                  - Exchange an authorization code");
    println!("  POST /login/token            - Log in with a Kubernetes bearer token");
    println!();
    println!("Session endpoints:");
    println!("  POST /refresh                - Refresh the session tokens");
    println!("  GET  /userinfo               - Username of the session");
    println!("  POST /logout                 - Clear the session");
    println!();
    println!("OAuth callback URL for identity providers:");
    println!("  {}", settings.callback_url());
    println!();
    println!("System endpoints:");
    println!("  GET  /authproviders          - Enabled providers");
    println!("  POST /authproviders/NAME/test - Test a provider configuration");
    println!("  GET  /ping                   - Health check");
}
