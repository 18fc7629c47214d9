//! Helpers for keeping credentials out of log output

use url::Url;

/// Mask a secret for logging, keeping only the first four characters.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(empty)".to_string();
    }
    match secret.char_indices().nth(4) {
        Some((idx, _)) => format!("{}***", &secret[..idx]),
        None => "***".to_string(),
    }
}

/// Drop query and fragment from a URL so it can be logged.
///
/// Unparseable input is replaced wholesale rather than echoed back.
#[must_use]
pub fn sanitize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("abcd"), "***");
        assert_eq!(mask_secret("abcdefgh"), "abcd***");
    }

    #[test]
    fn test_sanitize_url_strips_query() {
        assert_eq!(
            sanitize_url("https://idp.example.com/token?code=secret#frag"),
            "https://idp.example.com/token"
        );
        assert_eq!(sanitize_url("not a url"), "<invalid url>");
    }
}
