use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteLevel {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationNote {
    pub level: NoteLevel,
    pub text: String,
}

/// Validation status of a single configuration field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<ValidationNote>,
}

impl FieldValidation {
    /// A valid field; an empty value is not reported
    #[must_use]
    pub fn valid(value: &str) -> Self {
        Self {
            valid: true,
            value: Some(value.to_string()).filter(|v| !v.is_empty()),
            notes: Vec::new(),
        }
    }

    /// An invalid field carrying one error note
    #[must_use]
    pub fn invalid(text: impl Into<String>) -> Self {
        let mut field = Self::default();
        field.add_error(text);
        field
    }

    /// Mark the field invalid and record why
    pub fn add_error(&mut self, text: impl Into<String>) {
        self.valid = false;
        self.add_note(NoteLevel::Error, text);
    }

    pub fn add_warning(&mut self, text: impl Into<String>) {
        self.add_note(NoteLevel::Warning, text);
    }

    pub fn add_info(&mut self, text: impl Into<String>) {
        self.add_note(NoteLevel::Info, text);
    }

    fn add_note(&mut self, level: NoteLevel, text: impl Into<String>) {
        self.notes.push(ValidationNote {
            level,
            text: text.into(),
        });
    }

    #[must_use]
    pub fn with_error(mut self, text: impl Into<String>) -> Self {
        self.add_error(text);
        self
    }

    #[must_use]
    pub fn with_warning(mut self, text: impl Into<String>) -> Self {
        self.add_warning(text);
        self
    }

    #[must_use]
    pub fn with_info(mut self, text: impl Into<String>) -> Self {
        self.add_info(text);
        self
    }

    /// Whether the field says anything worth counting in the summary
    #[must_use]
    pub fn is_reported(&self) -> bool {
        self.value.is_some() || !self.notes.is_empty()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.notes
            .iter()
            .filter(|n| n.level == NoteLevel::Warning)
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcDiscoveryValidation {
    pub reachable: bool,
    pub discovery_url: FieldValidation,
    pub authorization_endpoint: FieldValidation,
    pub token_endpoint: FieldValidation,
    pub user_info_endpoint: FieldValidation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<FieldValidation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_grant_types: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2SettingsValidation {
    pub valid: bool,
    pub authorization_endpoint: FieldValidation,
    pub token_endpoint: FieldValidation,
    pub user_info_endpoint: FieldValidation,
    pub scopes: FieldValidation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgAssignmentValidation {
    pub valid: bool,
    #[serde(rename = "type")]
    pub assignment_type: FieldValidation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<FieldValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_path: Option<FieldValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name_prefix: Option<FieldValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name_suffix: Option<FieldValidation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_fields: usize,
    pub valid_fields: usize,
    pub error_fields: usize,
    pub warning_fields: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    pub next_steps: Vec<String>,
}

/// Report produced by testing a provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderValidationResult {
    pub valid: bool,
    pub client_id: FieldValidation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<FieldValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc_discovery: Option<OidcDiscoveryValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_settings: Option<OAuth2SettingsValidation>,
    /// `authUrl` of AAP and OpenShift providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<FieldValidation>,
    /// `tokenUrl` of OpenShift providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<FieldValidation>,
    pub username_claim: FieldValidation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_assignment: Option<OrgAssignmentValidation>,
    pub summary: ValidationSummary,
}
