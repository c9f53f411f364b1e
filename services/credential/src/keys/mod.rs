//! Signing key material.

pub mod provider;

pub use provider::{validate_secret, KeyMaterialProvider, KeySource, SigningKey};

use crate::error::CredentialError;
use jsonwebtoken::Algorithm;
use std::fmt;
use std::str::FromStr;

/// Minimum accepted secret length, in characters.
pub const MIN_SECRET_LENGTH: usize = 32;

/// JWK key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Symmetric octet sequence (HMAC).
    Oct,
    /// Octet key pair (Ed25519).
    Okp,
}

impl KeyType {
    /// Key type required by an algorithm.
    #[must_use]
    pub const fn for_algorithm(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::EdDSA => Self::Okp,
            _ => Self::Oct,
        }
    }

    /// Name used in the `kty` JWK member.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Oct => "oct",
            Self::Okp => "OKP",
        }
    }
}

impl FromStr for KeyType {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oct" => Ok(Self::Oct),
            "okp" => Ok(Self::Okp),
            _ => Err(CredentialError::config(format!("Invalid key type: {}", s))),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name used in the JWT header and the `alg` JWK member.
#[must_use]
pub const fn algorithm_name(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::HS256 => "HS256",
        Algorithm::HS384 => "HS384",
        Algorithm::HS512 => "HS512",
        Algorithm::ES256 => "ES256",
        Algorithm::ES384 => "ES384",
        Algorithm::RS256 => "RS256",
        Algorithm::RS384 => "RS384",
        Algorithm::RS512 => "RS512",
        Algorithm::PS256 => "PS256",
        Algorithm::PS384 => "PS384",
        Algorithm::PS512 => "PS512",
        Algorithm::EdDSA => "EdDSA",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_parsing() {
        assert_eq!(KeyType::from_str("oct").unwrap(), KeyType::Oct);
        assert_eq!(KeyType::from_str("OKP").unwrap(), KeyType::Okp);
        assert!(KeyType::from_str("RSA").is_err());
    }

    #[test]
    fn test_key_type_for_algorithm() {
        assert_eq!(KeyType::for_algorithm(Algorithm::HS512), KeyType::Oct);
        assert_eq!(KeyType::for_algorithm(Algorithm::EdDSA), KeyType::Okp);
    }

    #[test]
    fn test_algorithm_name() {
        assert_eq!(algorithm_name(Algorithm::HS256), "HS256");
        assert_eq!(algorithm_name(Algorithm::EdDSA), "EdDSA");
    }
}
