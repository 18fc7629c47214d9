//! PKCE (RFC 7636) verifier/challenge pairs

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// The only challenge method the gateway sends
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// 32 random bytes encode to a 43 character verifier, the RFC minimum
const VERIFIER_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh verifier from the thread-local CSPRNG
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; VERIFIER_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(bytes))
    }

    #[must_use]
    pub fn from_verifier(code_verifier: String) -> Self {
        let code_challenge = challenge_for(&code_verifier);
        Self {
            code_verifier,
            code_challenge,
        }
    }
}

/// `base64url(sha256(verifier))`
#[must_use]
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_challenge_matches_verifier() {
        for _ in 0..16 {
            let pkce = PkceChallenge::generate();
            assert!(pkce.code_verifier.len() >= 43);
            assert_eq!(pkce.code_challenge, challenge_for(&pkce.code_verifier));
            assert!(pkce
                .code_verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_verifiers_are_unique() {
        assert_ne!(
            PkceChallenge::generate().code_verifier,
            PkceChallenge::generate().code_verifier
        );
    }
}
