//! Base64url transport form of opaque tokens.

use crate::error::CredentialError;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

/// URL-safe decoder that accepts input with or without `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Transport form of a raw opaque token.
pub fn encode_token(raw: &str) -> String {
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

/// Raw opaque token from its transport form.
///
/// # Errors
///
/// Returns [`CredentialError::TokenRead`] if the input is not base64url or
/// does not decode to UTF-8.
pub fn decode_token(encoded: &str) -> Result<String, CredentialError> {
    let bytes = URL_SAFE_LENIENT
        .decode(encoded.trim())
        .map_err(|e| CredentialError::token_read(format!("Opaque token is not base64url: {}", e)))?;
    String::from_utf8(bytes).map_err(|_| CredentialError::token_read("Opaque token is not UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_form_is_url_safe() {
        let encoded = encode_token("a?b>c~~~");
        assert!(!encoded.contains(['+', '/', '=']));
        assert_eq!(decode_token(&encoded).unwrap(), "a?b>c~~~");
    }

    #[test]
    fn test_padded_input_accepted() {
        assert_eq!(decode_token("YWI=").unwrap(), "ab");
        assert_eq!(decode_token("YWI").unwrap(), "ab");
    }

    #[test]
    fn test_invalid_input_rejected() {
        assert!(decode_token("not base64!").is_err());
        assert!(decode_token("_w").is_err());
    }
}
