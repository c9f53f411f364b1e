//! Layered key material resolution.
//!
//! Every field resolves environment override → `KeySetOptions` → built-in
//! default. The result is immutable; configuration changes take effect by
//! building a new provider.

use crate::config::{KeyEnvironment, KeySetOptions};
use crate::error::CredentialError;
use crate::keys::{algorithm_name, KeyType, MIN_SECRET_LENGTH};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use ring::signature::{Ed25519KeyPair, KeyPair};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Algorithm used when neither configuration nor environment names one.
pub const DEFAULT_ALGORITHM: &str = "HS256";
/// Key type used when nothing is configured.
pub const DEFAULT_KEY_TYPE: &str = "oct";
/// Key id literal used when nothing is configured.
pub const DEFAULT_KEY_ID: &str = "credential-service-signing-key";
/// Development secret used when nothing is configured.
pub const DEFAULT_SECRET_KEY: &str = "credential-service-development-secret-change-me";

/// Which configuration tier supplied a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// `APP_*` environment variable.
    Environment,
    /// `KeySetOptions` section.
    Configuration,
    /// Built-in literal.
    Default,
}

/// Resolved signing and verification keys.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    public_key: Option<Vec<u8>>,
}

impl SigningKey {
    /// Key used to sign tokens.
    #[must_use]
    pub const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    /// Key used to verify tokens.
    #[must_use]
    pub const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    /// Raw public key bytes for asymmetric families.
    #[must_use]
    pub fn public_key(&self) -> Option<&[u8]> {
        self.public_key.as_deref()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key_len", &self.public_key.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

/// Resolves algorithm, key type, key id and signing key.
pub struct KeyMaterialProvider {
    algorithm: Algorithm,
    key_type: KeyType,
    key_id: String,
    secret: Zeroizing<String>,
    secret_source: KeySource,
    signing_key: SigningKey,
}

impl KeyMaterialProvider {
    /// Resolve key material from the configured section and environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::SigningKeyInvalid`] if the resolved secret is
    /// shorter than [`MIN_SECRET_LENGTH`] or is not a usable key for the
    /// algorithm, and [`CredentialError::Config`] if the algorithm and key type
    /// disagree.
    pub fn new(options: &KeySetOptions, environment: &KeyEnvironment) -> Result<Self, CredentialError> {
        let algorithm = parse_algorithm(options.alg.as_deref().unwrap_or(DEFAULT_ALGORITHM))?;
        let key_type = KeyType::from_str(options.key_type.as_deref().unwrap_or(DEFAULT_KEY_TYPE))?;
        if key_type != KeyType::for_algorithm(algorithm) {
            return Err(CredentialError::config(format!(
                "Key type {} does not match algorithm {}",
                key_type,
                algorithm_name(algorithm)
            )));
        }

        let (raw_key_id, _) = resolve(
            environment.key_id.as_deref(),
            options.key_id.as_deref(),
            DEFAULT_KEY_ID,
        );
        let key_id = URL_SAFE_NO_PAD.encode(raw_key_id.as_bytes());

        let (secret, secret_source) = resolve(
            environment.secret_key.as_deref(),
            options.secret_key.as_deref(),
            DEFAULT_SECRET_KEY,
        );
        let secret = Zeroizing::new(validate_secret(secret)?.to_string());
        let signing_key = build_signing_key(algorithm, &secret)?;

        if secret_source == KeySource::Default {
            warn!("No signing secret configured; using the built-in development secret");
        }
        debug!(
            algorithm = algorithm_name(algorithm),
            key_type = %key_type,
            key_id = %key_id,
            secret_source = ?secret_source,
            "Resolved key material"
        );

        Ok(Self {
            algorithm,
            key_type,
            key_id,
            secret,
            secret_source,
            signing_key,
        })
    }

    /// Signing algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// JWK key type.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Key id, base64url encoded.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Validated secret material.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret
    }

    /// Tier that supplied the secret.
    #[must_use]
    pub const fn secret_source(&self) -> KeySource {
        self.secret_source
    }

    /// Signing and verification keys.
    #[must_use]
    pub const fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl fmt::Debug for KeyMaterialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterialProvider")
            .field("algorithm", &self.algorithm)
            .field("key_type", &self.key_type)
            .field("key_id", &self.key_id)
            .field("secret_source", &self.secret_source)
            .finish_non_exhaustive()
    }
}

/// Reject secrets shorter than [`MIN_SECRET_LENGTH`] characters.
///
/// # Errors
///
/// Returns [`CredentialError::SigningKeyInvalid`] for short secrets.
pub fn validate_secret(secret: &str) -> Result<&str, CredentialError> {
    let length = secret.chars().count();
    if length < MIN_SECRET_LENGTH {
        return Err(CredentialError::signing_key(format!(
            "secret must be at least {} characters, got {}",
            MIN_SECRET_LENGTH, length
        )));
    }
    Ok(secret)
}

fn resolve<'a>(
    environment: Option<&'a str>,
    configured: Option<&'a str>,
    default: &'a str,
) -> (&'a str, KeySource) {
    match (environment, configured) {
        (Some(value), _) => (value, KeySource::Environment),
        (None, Some(value)) => (value, KeySource::Configuration),
        (None, None) => (default, KeySource::Default),
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm, CredentialError> {
    let algorithm = Algorithm::from_str(name)
        .map_err(|_| CredentialError::config(format!("Invalid signing algorithm: {}", name)))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 | Algorithm::EdDSA => Ok(algorithm),
        other => Err(CredentialError::config(format!(
            "Unsupported signing algorithm: {:?}",
            other
        ))),
    }
}

fn build_signing_key(algorithm: Algorithm, secret: &str) -> Result<SigningKey, CredentialError> {
    if algorithm != Algorithm::EdDSA {
        return Ok(SigningKey {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            public_key: None,
        });
    }

    let der = Zeroizing::new(
        STANDARD
            .decode(secret.trim())
            .map_err(|e| CredentialError::signing_key(format!("Ed25519 key is not base64: {}", e)))?,
    );
    let key_pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(&der)
        .map_err(|e| CredentialError::signing_key(format!("Ed25519 key rejected: {}", e)))?;
    let public_key = key_pair.public_key().as_ref().to_vec();

    Ok(SigningKey {
        encoding: EncodingKey::from_ed_der(&der),
        decoding: DecodingKey::from_ed_der(&public_key),
        public_key: Some(public_key),
    })
}
