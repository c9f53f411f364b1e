//! Access token verification.
//!
//! Two modes share one set of checks; [`ValidationMode::LifetimeExempt`]
//! only drops the expiry check and is reserved for refresh exchange.

use crate::config::JwtOptions;
use crate::error::CredentialError;
use crate::jwt::claims::{TokenClaims, CLAIM_EXPIRES};
use crate::keys::KeyMaterialProvider;
use jsonwebtoken::{decode, Validation};
use std::sync::Arc;
use tracing::debug;

/// Which checks a validation applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Signature, issuer, audience and lifetime.
    Strict,
    /// Signature, issuer and audience only.
    LifetimeExempt,
}

/// Verifies tokens minted by [`crate::jwt::TokenIssuer`].
pub struct TokenValidator {
    keys: Arc<KeyMaterialProvider>,
    issuer: Option<String>,
    audience: Option<String>,
    leeway_seconds: u64,
}

impl TokenValidator {
    /// Validator for tokens signed with `keys`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Config`] if issuer or audience validation is
    /// enabled without the expected value.
    pub fn new(keys: Arc<KeyMaterialProvider>, options: &JwtOptions) -> Result<Self, CredentialError> {
        let issuer = match (options.validate_issuer, &options.issuer) {
            (true, Some(issuer)) => Some(issuer.clone()),
            (true, None) => return Err(CredentialError::config("Issuer validation enabled without an issuer")),
            (false, _) => None,
        };
        let audience = match (options.validate_audience, &options.audience) {
            (true, Some(audience)) => Some(audience.clone()),
            (true, None) => return Err(CredentialError::config("Audience validation enabled without an audience")),
            (false, _) => None,
        };

        Ok(Self {
            keys,
            issuer,
            audience,
            leeway_seconds: options.clock_skew_seconds,
        })
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::TokenRead`] for empty or malformed input, a
    /// bad signature or algorithm, an issuer or audience mismatch, and (in
    /// strict mode) an expired token.
    pub fn validate_token(&self, token: &str, mode: ValidationMode) -> Result<TokenClaims, CredentialError> {
        if token.trim().is_empty() {
            return Err(CredentialError::token_read("Token is empty"));
        }

        let validation = self.validation(mode);
        let data = decode::<TokenClaims>(token, self.keys.signing_key().decoding_key(), &validation).map_err(|e| {
            debug!(mode = ?mode, error = %e, "Token validation failed");
            CredentialError::from(e)
        })?;

        Ok(data.claims)
    }

    /// Single named claim value from validated claims.
    #[must_use]
    pub fn resolve_token_value(claims: &TokenClaims, claim_name: &str) -> Option<String> {
        claims.resolve(claim_name)
    }

    fn validation(&self, mode: ValidationMode) -> Validation {
        let mut validation = Validation::new(self.keys.algorithm());
        validation.leeway = self.leeway_seconds;
        validation.validate_nbf = false;

        match &self.issuer {
            Some(issuer) => validation.set_issuer(&[issuer]),
            None => validation.iss = None,
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        if mode == ValidationMode::LifetimeExempt {
            validation.validate_exp = false;
            validation.required_spec_claims.remove(CLAIM_EXPIRES);
        }

        validation
    }
}
