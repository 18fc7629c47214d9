//! Provider registry
//!
//! Resolves a provider name to a ready-to-use [`ProviderVariant`]. The
//! configuration is fetched from the [`ConfigSource`] on every call and
//! nothing is cached between requests, so configuration changes take effect
//! immediately.

pub mod source;
pub mod spec;

pub use source::{ApiConfigSource, ConfigSource, StaticConfigSource};
pub use spec::{
    AuthConfig, ClaimPathSpec, OrganizationAssignment, ProviderSpec, ProviderType, Scopes,
};

use std::sync::Arc;

use crate::error::{ConfigError, GatewayError};
use crate::models::ProviderSummary;
use crate::providers::{
    oidc, AapProvider, K8sProvider, OAuth2Provider, OidcProvider, OpenShiftProvider,
    ProviderContext, ProviderVariant,
};
use crate::settings::{ConfigSourceKind, GatewaySettings};

/// A provider spec together with its place in the current configuration
#[derive(Debug, Clone)]
pub struct ResolvedSpec {
    pub spec: ProviderSpec,
    pub is_default: bool,
    pub organizations_enabled: bool,
}

#[derive(Clone)]
pub struct ProviderRegistry {
    source: Arc<dyn ConfigSource>,
    context: ProviderContext,
    /// Client id given to the default provider when its spec carries none
    default_client_id: String,
    /// Internal URL given to the default provider when its spec carries none
    internal_auth_url: Option<String>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("context", &self.context)
            .field("default_client_id", &self.default_client_id)
            .field("internal_auth_url", &self.internal_auth_url)
            .finish_non_exhaustive()
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(source: Arc<dyn ConfigSource>, context: ProviderContext) -> Self {
        Self {
            source,
            context,
            default_client_id: String::new(),
            internal_auth_url: None,
        }
    }

    /// Build the registry with the config source selected in the settings
    #[must_use]
    pub fn from_settings(settings: &GatewaySettings, http: reqwest::Client) -> Self {
        let source: Arc<dyn ConfigSource> = match settings.auth.config_source {
            ConfigSourceKind::Api => {
                Arc::new(ApiConfigSource::new(http.clone(), &settings.api.api_url))
            }
            ConfigSourceKind::Static => Arc::new(StaticConfigSource::from_settings(settings)),
        };
        Self::new(source, ProviderContext::from_settings(settings, http))
            .with_default_overrides(
                &settings.auth.client_id,
                settings.api.internal_auth_url.as_deref(),
            )
    }

    /// Values applied to the default provider when its spec leaves them empty
    #[must_use]
    pub fn with_default_overrides(
        mut self,
        client_id: &str,
        internal_auth_url: Option<&str>,
    ) -> Self {
        client_id.clone_into(&mut self.default_client_id);
        self.internal_auth_url = internal_auth_url
            .filter(|u| !u.trim().is_empty())
            .map(str::to_string);
        self
    }

    #[must_use]
    pub fn context(&self) -> &ProviderContext {
        &self.context
    }

    /// Current configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::AuthDisabled` when the source reports
    /// authentication as disabled, or the source's own error
    pub async fn fetch_config(&self) -> Result<AuthConfig, GatewayError> {
        self.source
            .fetch_auth_config()
            .await?
            .ok_or_else(|| ConfigError::AuthDisabled.into())
    }

    /// Look up a provider spec by name; an empty name means the default provider
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` for unknown names, `ConfigError::Disabled`
    /// for disabled providers and any error of [`Self::fetch_config`]
    pub async fn spec(&self, name: &str) -> Result<ResolvedSpec, GatewayError> {
        let config = self.fetch_config().await?;
        self.lookup(&config, name)
    }

    fn lookup(&self, config: &AuthConfig, name: &str) -> Result<ResolvedSpec, GatewayError> {
        let default_name = config.default_provider.as_deref().unwrap_or_default();
        let wanted = if name.is_empty() { default_name } else { name };

        let spec = config
            .find(wanted)
            .ok_or_else(|| ConfigError::NotFound(wanted.to_string()))?;
        if !spec.enabled {
            return Err(ConfigError::Disabled(wanted.to_string()).into());
        }

        let is_default = !default_name.is_empty() && spec.name == default_name;
        let spec = if is_default {
            self.with_default_values(spec.clone())
        } else {
            spec.clone()
        };

        Ok(ResolvedSpec {
            spec,
            is_default,
            organizations_enabled: config.organizations_enabled,
        })
    }

    /// Look up a provider spec by name whether or not it is enabled, as the
    /// configuration tester needs to check providers before they are switched on
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` for unknown names and any error of
    /// [`Self::fetch_config`]
    pub async fn configured_spec(&self, name: &str) -> Result<ProviderSpec, GatewayError> {
        let config = self.fetch_config().await?;
        let spec = config
            .find(name)
            .ok_or_else(|| ConfigError::NotFound(name.to_string()))?;

        if config.default_provider.as_deref() == Some(name) {
            Ok(self.with_default_values(spec.clone()))
        } else {
            Ok(spec.clone())
        }
    }

    fn with_default_values(&self, mut spec: ProviderSpec) -> ProviderSpec {
        if spec.get_client_id().is_empty() {
            spec.client_id.clone_from(&self.default_client_id);
        }
        if spec.internal_url().is_none() {
            spec.internal_url.clone_from(&self.internal_auth_url);
        }
        spec
    }

    /// Resolve a provider by name and build its variant
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be found, is disabled, is
    /// misconfigured, or (for OIDC) its discovery document cannot be fetched
    pub async fn resolve(&self, name: &str) -> Result<ProviderVariant, GatewayError> {
        let resolved = self.spec(name).await?;
        let variant = self.build(&resolved).await?;
        log::info!(
            "Resolved provider '{}' as {}",
            resolved.spec.name,
            variant.kind()
        );
        Ok(variant)
    }

    /// Construct the variant a spec describes
    ///
    /// # Errors
    ///
    /// See [`Self::resolve`]
    pub async fn build(&self, resolved: &ResolvedSpec) -> Result<ProviderVariant, GatewayError> {
        let spec = &resolved.spec;
        let context = &self.context;

        Ok(match spec.provider_type {
            ProviderType::K8s if spec.is_openshift_oauth() => {
                ProviderVariant::OpenShift(OpenShiftProvider::new(spec, context)?)
            }
            ProviderType::K8s => ProviderVariant::K8s(K8sProvider::new(
                &spec.name,
                context.http.clone(),
                &context.api_url,
            )),
            ProviderType::Oidc => {
                let default_scope = if resolved.is_default && resolved.organizations_enabled {
                    oidc::DEFAULT_ORGANIZATION_SCOPE
                } else {
                    oidc::DEFAULT_SCOPE
                };
                ProviderVariant::Oidc(OidcProvider::discover(spec, context, default_scope).await?)
            }
            ProviderType::OAuth2 => ProviderVariant::OAuth2(OAuth2Provider::new(spec, context)?),
            ProviderType::Aap => ProviderVariant::Aap(AapProvider::new(spec, context)?),
            ProviderType::OpenShift => {
                ProviderVariant::OpenShift(OpenShiftProvider::new(spec, context)?)
            }
        })
    }

    /// Public information on the enabled providers
    ///
    /// # Errors
    ///
    /// Returns any error of [`Self::fetch_config`]
    pub async fn list(&self) -> Result<Vec<ProviderSummary>, GatewayError> {
        let config = self.fetch_config().await?;
        let default_name = config.default_provider.as_deref().unwrap_or_default();
        Ok(config
            .providers
            .iter()
            .filter(|spec| spec.enabled)
            .map(|spec| ProviderSummary::from_spec(spec, spec.name == default_name))
            .collect())
    }
}
