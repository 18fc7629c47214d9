//! Encoding of the OAuth `state` parameter
//!
//! The state always names the provider so that several providers can share a
//! single callback route. When the cookie channel is not trusted, the PKCE
//! verifier may ride along as a suffix.

const STATE_PREFIX: &str = "provider:";
const PKCE_MARKER: &str = ":pkce:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub provider: String,
    pub code_verifier: Option<String>,
}

impl OAuthState {
    #[must_use]
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            code_verifier: None,
        }
    }

    #[must_use]
    pub fn with_verifier(mut self, verifier: &str) -> Self {
        self.code_verifier = Some(verifier.to_string());
        self
    }

    /// `provider:<name>` or `provider:<name>:pkce:<verifier>`
    #[must_use]
    pub fn encode(&self) -> String {
        match &self.code_verifier {
            Some(verifier) => format!("{STATE_PREFIX}{}{PKCE_MARKER}{verifier}", self.provider),
            None => format!("{STATE_PREFIX}{}", self.provider),
        }
    }

    /// Parse a state returned by the IdP. Returns `None` for foreign states.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(STATE_PREFIX)?;
        let (provider, code_verifier) = match rest.split_once(PKCE_MARKER) {
            Some((provider, verifier)) => {
                (provider, Some(verifier.to_string()).filter(|v| !v.is_empty()))
            }
            None => (rest, None),
        };

        if provider.is_empty() {
            return None;
        }
        Some(Self {
            provider: provider.to_string(),
            code_verifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_plain_state() {
        assert_eq!(OAuthState::new("github").encode(), "provider:github");
    }

    #[test]
    fn test_parse_with_verifier() {
        let state = OAuthState::parse("provider:keycloak:pkce:abc-_123").unwrap();
        assert_eq!(state.provider, "keycloak");
        assert_eq!(state.code_verifier.as_deref(), Some("abc-_123"));

        let encoded = OAuthState::new("keycloak").with_verifier("abc-_123").encode();
        assert_eq!(OAuthState::parse(&encoded).unwrap(), state);
    }

    #[test]
    fn test_parse_rejects_foreign_states() {
        assert_eq!(OAuthState::parse("random-csrf-token"), None);
        assert_eq!(OAuthState::parse("provider:"), None);
        assert_eq!(OAuthState::parse("provider::pkce:abc"), None);
        assert_eq!(
            OAuthState::parse("provider:p:pkce:").unwrap().code_verifier,
            None
        );
    }
}
