//! Access token issuance.

use crate::config::{JwtOptions, MAX_EXPIRES_IN_SECONDS};
use crate::error::CredentialError;
use crate::jwt::claims::TokenClaims;
use crate::keys::{algorithm_name, KeyMaterialProvider};
use crate::metrics;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A signed access token and its validity window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// Compact JWS.
    pub token: String,
    /// Seconds until expiry at issuance.
    pub expires_in: i64,
}

/// Mints signed access tokens.
pub struct TokenIssuer {
    keys: Arc<KeyMaterialProvider>,
    issuer: Option<String>,
    audience: Option<String>,
    ttl_seconds: i64,
}

impl TokenIssuer {
    /// Issuer signing with `keys` under `options`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Config`] if the validity window is not
    /// positive or exceeds [`MAX_EXPIRES_IN_SECONDS`].
    pub fn new(keys: Arc<KeyMaterialProvider>, options: &JwtOptions) -> Result<Self, CredentialError> {
        if !(1..=MAX_EXPIRES_IN_SECONDS).contains(&options.expires_in_seconds) {
            return Err(CredentialError::config(format!(
                "Token validity window must be between 1 and {} seconds, got {}",
                MAX_EXPIRES_IN_SECONDS,
                options.expires_in_seconds
            )));
        }

        Ok(TokenIssuer {
            keys,
            issuer: options.issuer.clone(),
            audience: options.audience.clone(),
            ttl_seconds: options.expires_in_seconds,
        })
    }

    /// Validity window reported as `expires_in`.
    pub fn expires_in(&self) -> i64 {
        self.ttl_seconds
    }

    /// Mint a token issued now.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Internal`] if signing fails or the expiry
    /// does not fit in a timestamp.
    pub fn create_token(
        &self,
        user_id: &str,
        user_name: &str,
        roles: &[String],
        scopes: &[String],
    ) -> Result<AccessToken, CredentialError> {
        self.create_token_at(user_id, user_name, roles, scopes, Utc::now())
    }

    /// Mint a token as if issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// As [`Self::create_token`].
    pub fn create_token_at(
        &self,
        user_id: &str,
        user_name: &str,
        roles: &[String],
        scopes: &[String],
        issued_at: DateTime<Utc>,
    ) -> Result<AccessToken, CredentialError> {
        let claims = TokenClaims::new(
            user_id.to_string(),
            user_name.to_string(),
            issued_at.timestamp(),
            self.ttl_seconds,
        )?
        .with_issuer(self.issuer.clone())
        .with_audience(self.audience.clone())
        .with_roles(roles.to_vec())
        .with_scopes(scopes.to_vec());

        let mut header = Header::new(self.keys.algorithm());
        header.kid = Some(self.keys.key_id().to_string());

        let token = encode(&header, &claims, self.keys.signing_key().encoding_key())
            .map_err(|e| CredentialError::internal(format!("Token signing failed: {}", e)))?;

        let algorithm = algorithm_name(self.keys.algorithm());
        metrics::record_token_issued(algorithm);
        debug!(
            user_id = %user_id,
            token_id = %claims.jti,
            roles = roles.len(),
            scopes = scopes.len(),
            "Issued access token"
        );

        Ok(AccessToken {
            token,
            expires_in: self.ttl_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KeyEnvironment, KeySetOptions};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    fn provider() -> Arc<KeyMaterialProvider> {
        let options = KeySetOptions {
            secret_key: Some("0123456789012345678901234567890X".to_string()),
            ..KeySetOptions::default()
        };
        Arc::new(KeyMaterialProvider::new(&options, &KeyEnvironment::default()).unwrap())
    }

    fn payload(token: &str) -> serde_json::Value {
        let part = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(part).unwrap()).unwrap()
    }

    #[test]
    fn test_non_positive_window_rejected() {
        let options = JwtOptions {
            expires_in_seconds: 0,
            ..JwtOptions::default()
        };
        assert!(matches!(TokenIssuer::new(provider(), &options), Err(CredentialError::Config(_))));
    }

    #[test]
    fn test_oversized_window_rejected() {
        let options = JwtOptions {
            expires_in_seconds: i64::MAX,
            ..JwtOptions::default()
        };
        assert!(matches!(TokenIssuer::new(provider(), &options), Err(CredentialError::Config(_))));
    }

    #[test]
    fn test_claims_layout() {
        let issuer = TokenIssuer::new(provider(), &JwtOptions::default()).unwrap();
        let token = issuer
            .create_token("u1", "alice", &["svc:role".to_string()], &["user:edit".to_string()])
            .unwrap();

        let claims = payload(&token.token);
        assert_eq!(claims["sub"], "alice");
        assert_eq!(claims["id"], "u1");
        assert_eq!(claims["rol"], serde_json::json!(["svc:role"]));
        assert_eq!(claims["scope"], serde_json::json!(["user:edit"]));
        assert!(claims["jti"].as_str().is_some_and(|j| !j.is_empty()));
        assert!(claims["iat"].is_i64());
        assert!(claims.get("iss").is_none());
        assert_eq!(token.expires_in, 300);
    }

    #[test]
    fn test_header_carries_kid() {
        let keys = provider();
        let issuer = TokenIssuer::new(keys.clone(), &JwtOptions::default()).unwrap();
        let token = issuer.create_token("u1", "alice", &[], &[]).unwrap();

        let header = jsonwebtoken::decode_header(&token.token).unwrap();
        assert_eq!(header.kid.as_deref(), Some(keys.key_id()));
        assert_eq!(header.alg, jsonwebtoken::Algorithm::HS256);
    }

    #[test]
    fn test_issuer_and_audience_embedded() {
        let options = JwtOptions {
            issuer: Some("identity".to_string()),
            audience: Some("api".to_string()),
            ..JwtOptions::default()
        };
        let issuer = TokenIssuer::new(provider(), &options).unwrap();
        let claims = payload(&issuer.create_token("u1", "alice", &[], &[]).unwrap().token);

        assert_eq!(claims["iss"], "identity");
        assert_eq!(claims["aud"], "api");
    }
}
