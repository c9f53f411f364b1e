//! Error types for credential issuance and validation.
//!
//! Token failures keep their detail for logs only. Anything that reaches a
//! client goes through [`CredentialError::public_message`].

use thiserror::Error;

/// Errors raised by the credential subsystem.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Resolved signing secret is too short or cannot be decoded.
    #[error("Signing key invalid: {0}")]
    SigningKeyInvalid(String),

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token could not be read: malformed, bad signature, wrong issuer or
    /// audience, or expired in strict mode.
    #[error("Token read error: {0}")]
    TokenRead(String),

    /// Access token presented for refresh did not identify a user.
    #[error("Invalid token")]
    InvalidAccessToken,

    /// Refresh token does not match a live stored row.
    #[error("Invalid token")]
    InvalidRefreshToken,

    /// Scope claim is not of the form `resource:action`.
    #[error("Invalid scope claim: {0}")]
    InvalidScope(String),

    /// Storage collaborator failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CredentialError {
    /// Create a signing key error.
    #[must_use]
    pub fn signing_key(msg: impl Into<String>) -> Self {
        Self::SigningKeyInvalid(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a token read error.
    #[must_use]
    pub fn token_read(msg: impl Into<String>) -> Self {
        Self::TokenRead(msg.into())
    }

    /// Create a storage error.
    #[must_use]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller should be told it is not authenticated.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::TokenRead(_) | Self::InvalidAccessToken | Self::InvalidRefreshToken
        )
    }

    /// Stable code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SigningKeyInvalid(_) => SIGNING_KEY_INVALID,
            Self::Config(_) => CONFIG_INVALID,
            Self::TokenRead(_) | Self::InvalidAccessToken | Self::InvalidRefreshToken => {
                TOKEN_INVALID
            }
            Self::InvalidScope(_) => SCOPE_INVALID,
            Self::Storage(_) | Self::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// Message safe to return to a client.
    ///
    /// Token failures collapse to one message so a caller cannot tell which
    /// half of a token pair was rejected.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::TokenRead(_) | Self::InvalidAccessToken | Self::InvalidRefreshToken => {
                "Invalid token"
            }
            Self::InvalidScope(_) => "Invalid scope",
            _ => "Internal server error",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for CredentialError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::TokenRead(err.to_string())
    }
}

impl From<config::ConfigError> for CredentialError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

// Error codes for API responses
/// Signing key rejected at startup.
pub const SIGNING_KEY_INVALID: &str = "SIGNING_KEY_INVALID";
/// Configuration rejected at startup.
pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
/// Any token that failed to authenticate.
pub const TOKEN_INVALID: &str = "TOKEN_INVALID";
/// Malformed scope claim.
pub const SCOPE_INVALID: &str = "SCOPE_INVALID";
/// Everything else.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_failures_share_public_message() {
        let access = CredentialError::InvalidAccessToken;
        let refresh = CredentialError::InvalidRefreshToken;
        let read = CredentialError::token_read("InvalidSignature");

        assert_eq!(access.to_string(), refresh.to_string());
        assert_eq!(access.public_message(), refresh.public_message());
        assert_eq!(read.public_message(), refresh.public_message());
        assert_eq!(access.code(), TOKEN_INVALID);
    }

    #[test]
    fn test_unauthorized_classification() {
        assert!(CredentialError::InvalidRefreshToken.is_unauthorized());
        assert!(CredentialError::token_read("expired").is_unauthorized());
        assert!(!CredentialError::signing_key("short").is_unauthorized());
        assert!(!CredentialError::storage("down").is_unauthorized());
    }

    #[test]
    fn test_internal_detail_not_public() {
        let err = CredentialError::storage("connection refused to 10.0.0.5");
        assert!(!err.public_message().contains("10.0.0.5"));
        assert_eq!(err.code(), INTERNAL_ERROR);
    }
}
