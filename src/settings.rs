use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::registry::ProviderSpec;

/// Directory that may hold a `Settings.toml` taking precedence over the one in the CWD
pub const SECRETS_DIR_ENV: &str = "AUTHGATE_SECRETS_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewaySettings {
    pub application: ApplicationSettings,
    pub api: ApiSettings,
    pub auth: AuthSettings,
    pub cookies: CookieSettings,
    pub logging: LoggingSettings,
    /// Providers served by the static config source
    pub providers: Vec<ProviderSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Public URL of the UI; OAuth callbacks land on `{base_ui_url}/callback`
    pub base_ui_url: String,
    pub cors_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the backend API (auth config and bearer-token validation)
    pub api_url: String,
    /// Cluster-local URL of the default IdP, used for server-to-server calls
    pub internal_auth_url: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSourceKind {
    /// Fetch `/api/v1/auth/config` from the backend API on every request
    Api,
    /// Serve the `[[providers]]` table of this file
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub config_source: ConfigSourceKind,
    /// Client id used when the default provider's spec carries none
    pub client_id: String,
    /// Default provider for the static config source
    pub default_provider: Option<String>,
    /// Organizations flag for the static config source
    pub organizations_enabled: bool,
    /// Embed the PKCE verifier in the OAuth `state` as a fallback for the cookie
    pub pkce_state_fallback: bool,
    pub validation_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    /// Set when the gateway is served over TLS
    pub secure: bool,
    pub session_cookie_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_ui_url: "http://localhost:9000".to_string(),
            cors_origins: "http://localhost:9000".to_string(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_url: "https://localhost:3443".to_string(),
            internal_auth_url: None,
            request_timeout_secs: 30,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            config_source: ConfigSourceKind::Api,
            client_id: "authgate".to_string(),
            default_provider: None,
            organizations_enabled: false,
            pkce_state_fallback: true,
            validation_timeout_secs: 10,
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: false,
            session_cookie_name: "authgate_session".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl GatewaySettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - A settings file cannot be read or parsed
    pub fn load() -> anyhow::Result<Self> {
        Self::initialize_environment()?;

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Load `.env` and initialize logging
    fn initialize_environment() -> anyhow::Result<()> {
        Self::load_env_file();
        env_logger::try_init().context("Failed to initialize logger")?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    ///
    /// Priority, highest first:
    /// 1. Environment variables (applied after this returns)
    /// 2. `Settings.toml` in `AUTHGATE_SECRETS_DIR`
    /// 3. `Settings.toml` in the current directory
    /// 4. Defaults
    fn load_base_settings() -> anyhow::Result<Self> {
        let mut settings = Self::default();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(default_config_path)?;
            log::info!("Loaded base settings from {}", default_config_path.display());
        }

        if let Ok(secrets_dir) = std::env::var(SECRETS_DIR_ENV) {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                log::info!("Overriding settings from {}", secrets_path.display());
            } else {
                log::info!(
                    "{SECRETS_DIR_ENV} set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid settings TOML
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        basic_toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_api_env_overrides(&mut settings.api);
        Self::apply_auth_env_overrides(&mut settings.auth);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(base_ui_url) = std::env::var("BASE_UI_URL") {
            app_settings.base_ui_url = base_ui_url;
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    fn apply_api_env_overrides(api_settings: &mut ApiSettings) {
        if let Ok(api_url) = std::env::var("API_URL") {
            api_settings.api_url = api_url;
        }
        if let Ok(internal_auth_url) = std::env::var("INTERNAL_AUTH_URL") {
            api_settings.internal_auth_url =
                Some(internal_auth_url).filter(|value| !value.is_empty());
        }
        Self::apply_numeric_env_override(
            "API_TIMEOUT_SECS",
            &mut api_settings.request_timeout_secs,
        );
    }

    fn apply_auth_env_overrides(auth_settings: &mut AuthSettings) {
        if let Ok(source) = std::env::var("AUTH_CONFIG_SOURCE") {
            match source.to_ascii_lowercase().as_str() {
                "api" => auth_settings.config_source = ConfigSourceKind::Api,
                "static" => auth_settings.config_source = ConfigSourceKind::Static,
                other => log::warn!("Ignoring unknown AUTH_CONFIG_SOURCE '{other}'"),
            }
        }
        if let Ok(client_id) = std::env::var("AUTH_CLIENT_ID") {
            auth_settings.client_id = client_id;
        }
        Self::apply_bool_env_override(
            "AUTH_PKCE_STATE_FALLBACK",
            &mut auth_settings.pkce_state_fallback,
        );
        Self::apply_numeric_env_override(
            "AUTH_VALIDATION_TIMEOUT_SECS",
            &mut auth_settings.validation_timeout_secs,
        );
    }

    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        Self::apply_bool_env_override("COOKIE_SECURE", &mut cookie_settings.secure);
        if let Ok(name) = std::env::var("SESSION_COOKIE_NAME") {
            cookie_settings.session_cookie_name = name;
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    fn apply_bool_env_override(env_var: &str, target: &mut bool) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<bool>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Redirect URI registered with every IdP
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!(
            "{}/callback",
            self.application.base_ui_url.trim_end_matches('/')
        )
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    #[must_use]
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.auth.validation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clean_env_vars() {
        for var in [
            "HOST",
            "PORT",
            "BASE_UI_URL",
            "API_URL",
            "INTERNAL_AUTH_URL",
            "API_TIMEOUT_SECS",
            "AUTH_CONFIG_SOURCE",
            "AUTH_CLIENT_ID",
            "AUTH_PKCE_STATE_FALLBACK",
            "COOKIE_SECURE",
            "SESSION_COOKIE_NAME",
            SECRETS_DIR_ENV,
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let settings = GatewaySettings::default();
        assert_eq!(settings.get_bind_address(), "0.0.0.0:8080");
        assert_eq!(settings.auth.config_source, ConfigSourceKind::Api);
        assert!(settings.auth.pkce_state_fallback);
        assert_eq!(settings.api.request_timeout_secs, 30);
        assert_eq!(settings.auth.validation_timeout_secs, 10);
        assert_eq!(settings.cookies.session_cookie_name, "authgate_session");
    }

    #[test]
    fn test_callback_url_trims_trailing_slash() {
        let mut settings = GatewaySettings::default();
        settings.application.base_ui_url = "https://ui.example.com/".to_string();
        assert_eq!(settings.callback_url(), "https://ui.example.com/callback");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clean_env_vars();
        std::env::set_var("PORT", "9443");
        std::env::set_var("API_URL", "https://api.internal:3443");
        std::env::set_var("INTERNAL_AUTH_URL", "http://keycloak.svc:8080/realms/main");
        std::env::set_var("AUTH_CONFIG_SOURCE", "static");
        std::env::set_var("AUTH_PKCE_STATE_FALLBACK", "false");
        std::env::set_var("COOKIE_SECURE", "true");

        let mut settings = GatewaySettings::default();
        GatewaySettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.application.port, 9443);
        assert_eq!(settings.api.api_url, "https://api.internal:3443");
        assert_eq!(
            settings.api.internal_auth_url.as_deref(),
            Some("http://keycloak.svc:8080/realms/main")
        );
        assert_eq!(settings.auth.config_source, ConfigSourceKind::Static);
        assert!(!settings.auth.pkce_state_fallback);
        assert!(settings.cookies.secure);

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        clean_env_vars();
        std::env::set_var("PORT", "not-a-port");
        std::env::set_var("COOKIE_SECURE", "maybe");
        std::env::set_var("AUTH_CONFIG_SOURCE", "database");

        let mut settings = GatewaySettings::default();
        GatewaySettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.application.port, 8080);
        assert!(!settings.cookies.secure);
        assert_eq!(settings.auth.config_source, ConfigSourceKind::Api);

        clean_env_vars();
    }

    #[test]
    fn test_from_file_with_static_providers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[application]
base_ui_url = "https://ui.example.com"

[auth]
config_source = "static"
default_provider = "keycloak"

[[providers]]
name = "keycloak"
type = "oidc"
clientId = "ui"
issuer = "https://sso.example.com/realms/main"
scopes = "openid profile email"

[[providers]]
name = "github"
type = "oauth2"
clientId = "gh"
authorizationUrl = "https://github.com/login/oauth/authorize"
tokenUrl = "https://github.com/login/oauth/access_token"
userInfoUrl = "https://api.github.com/user"
scopes = ["read:user"]
usernameClaim = ["login"]
"#
        )
        .unwrap();

        let settings = GatewaySettings::from_file(file.path()).unwrap();
        assert_eq!(settings.auth.config_source, ConfigSourceKind::Static);
        assert_eq!(settings.auth.default_provider.as_deref(), Some("keycloak"));
        assert_eq!(settings.providers.len(), 2);
        // unspecified sections keep their defaults
        assert_eq!(settings.application.port, 8080);

        let github = &settings.providers[1];
        assert_eq!(github.name, "github");
        assert_eq!(github.scope_list(), vec!["read:user"]);
        assert_eq!(
            github.username_claim_path().unwrap(),
            Some(vec!["login".to_string()])
        );
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[application\nport = ").unwrap();
        assert!(GatewaySettings::from_file(file.path()).is_err());
    }
}
