//! Session cookie wire format: `base64(JSON(TokenData))`

use base64::{engine::general_purpose, Engine as _};

use super::TokenData;
use crate::error::GatewayError;

/// Encode session data for storage in a cookie
///
/// # Errors
///
/// Returns an error if serialization fails
pub fn encode_token_data(token: &TokenData) -> Result<String, GatewayError> {
    let json = serde_json::to_vec(token)
        .map_err(|e| GatewayError::Session(format!("Failed to serialize session: {e}")))?;
    Ok(general_purpose::STANDARD.encode(json))
}

/// Decode a cookie value back into session data
///
/// # Errors
///
/// Returns a session error if the value is not valid base64 or not a JSON
/// encoded `TokenData`
pub fn decode_token_data(value: &str) -> Result<TokenData, GatewayError> {
    let bytes = general_purpose::STANDARD
        .decode(value.trim())
        .map_err(|e| GatewayError::Session(format!("Failed to decode session cookie: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| GatewayError::Session(format!("Failed to parse session cookie: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_full_and_empty() {
        let full = TokenData {
            id_token: "id".into(),
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            provider: "oidc-test".into(),
        };
        let partial = TokenData {
            access_token: "access".into(),
            provider: "github".into(),
            ..Default::default()
        };

        for token in [full, partial, TokenData::default()] {
            let encoded = encode_token_data(&token).unwrap();
            assert_eq!(decode_token_data(&encoded).unwrap(), token);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_token_data("%%%not-base64"),
            Err(GatewayError::Session(_))
        ));

        let not_json = general_purpose::STANDARD.encode("plain text");
        assert!(matches!(
            decode_token_data(&not_json),
            Err(GatewayError::Session(_))
        ));
    }
}
