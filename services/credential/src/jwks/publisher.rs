//! Key set document built from the active key.

use crate::keys::{algorithm_name, KeyMaterialProvider, KeyType};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Curve name published for Ed25519 keys.
pub const ED25519_CURVE: &str = "Ed25519";

/// One published verification key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonWebKey {
    /// `oct` or `OKP`.
    pub kty: String,
    /// Base64url key id, as in token headers.
    pub kid: String,
    /// Always `sig`.
    #[serde(rename = "use")]
    pub key_use: String,
    /// Signing algorithm name.
    pub alg: String,
    /// Curve, `OKP` keys only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// Base64url public key, `OKP` keys only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
}

impl JsonWebKey {
    /// Describe the provider's active key without any secret material.
    pub fn from_provider(provider: &KeyMaterialProvider) -> Self {
        let (crv, x) = match provider.key_type() {
            KeyType::Oct => (None, None),
            KeyType::Okp => (
                Some(ED25519_CURVE.to_string()),
                provider
                    .signing_key()
                    .public_key()
                    .map(|bytes| URL_SAFE_NO_PAD.encode(bytes)),
            ),
        };

        JsonWebKey {
            kty: provider.key_type().as_str().to_string(),
            kid: provider.key_id().to_string(),
            key_use: "sig".to_string(),
            alg: algorithm_name(provider.algorithm()).to_string(),
            crv,
            x,
        }
    }
}

/// The `{"keys": [...]}` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonWebKeySet {
    /// Published keys.
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        JsonWebKeySet { keys: Vec::new() }
    }

    /// Append a key.
    pub fn add_key(&mut self, key: JsonWebKey) {
        self.keys.push(key);
    }

    /// Serialized document.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Publishes the single active verification key.
///
/// The document is computed once; key changes require a new publisher.
pub struct JwksPublisher {
    key_set: JsonWebKeySet,
}

impl JwksPublisher {
    /// Publisher for the provider's active key.
    pub fn new(provider: &KeyMaterialProvider) -> Self {
        let mut key_set = JsonWebKeySet::new();
        key_set.add_key(JsonWebKey::from_provider(provider));
        JwksPublisher { key_set }
    }

    /// The published document.
    pub fn key_set(&self) -> &JsonWebKeySet {
        &self.key_set
    }

    /// Id of the published key.
    pub fn current_key_id(&self) -> Option<&str> {
        self.key_set.keys.first().map(|k| k.kid.as_str())
    }
}
