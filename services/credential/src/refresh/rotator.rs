//! Refresh exchange and revocation.

use crate::error::CredentialError;
use crate::jwt::claims::{CLAIM_SUBJECT, CLAIM_USER_ID};
use crate::jwt::{AccessToken, TokenIssuer, TokenValidator, ValidationMode};
use crate::metrics;
use crate::refresh::entity::RefreshToken;
use crate::refresh::value;
use crate::storage::{RefreshTokenRepository, RoleStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A fresh access token and the refresh value that replaces the one presented.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// New access token.
    pub access_token: AccessToken,
    /// New refresh value.
    pub refresh_token: String,
}

/// Single-use refresh values bound to a user.
///
/// Each successful exchange rotates the row in place; the presented value
/// stops matching as soon as the conditional write lands.
pub struct RefreshTokenRotator {
    repository: Arc<dyn RefreshTokenRepository>,
    roles: Arc<dyn RoleStore>,
    issuer: Arc<TokenIssuer>,
    validator: Arc<TokenValidator>,
    lifetime: Duration,
}

impl RefreshTokenRotator {
    /// Rotator issuing values valid for `lifetime`.
    pub fn new(
        repository: Arc<dyn RefreshTokenRepository>,
        roles: Arc<dyn RoleStore>,
        issuer: Arc<TokenIssuer>,
        validator: Arc<TokenValidator>,
        lifetime: Duration,
    ) -> Self {
        RefreshTokenRotator {
            repository,
            roles,
            issuer,
            validator,
            lifetime,
        }
    }

    /// Lifetime applied to new and rotated refresh values.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Persist a new refresh value for `user_id` and return it.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn issue_initial(&self, user_id: &str, expires_at: DateTime<Utc>) -> Result<String, CredentialError> {
        let token = value::new_value();
        let entity = RefreshToken::new(user_id.to_string(), value::digest(&token), expires_at);

        self.repository.create(&entity).await?;

        info!(user_id = %user_id, row_id = %entity.id, "Issued refresh token");
        Ok(token)
    }

    /// [`Self::issue_initial`] with the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Internal`] if the lifetime runs past the
    /// representable date range.
    pub async fn issue_for(&self, user_id: &str) -> Result<String, CredentialError> {
        self.issue_initial(user_id, self.expiry_from_now()?).await
    }

    fn expiry_from_now(&self) -> Result<DateTime<Utc>, CredentialError> {
        Utc::now()
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| CredentialError::internal("Refresh token expiry overflows"))
    }

    /// Trade an access token (expired or not) plus its refresh value for a new pair.
    ///
    /// # Errors
    ///
    /// [`CredentialError::InvalidAccessToken`] if the access token fails
    /// lifetime-exempt validation or lacks the user claims.
    /// [`CredentialError::InvalidRefreshToken`] if no active row matches or a
    /// concurrent exchange already rotated it.
    pub async fn exchange(&self, access_token: &str, refresh_value: &str) -> Result<TokenPair, CredentialError> {
        let result = self.exchange_inner(access_token, refresh_value).await;
        let status = match &result {
            Ok(_) => "success",
            Err(CredentialError::InvalidAccessToken) => "invalid_access_token",
            Err(CredentialError::InvalidRefreshToken) => "invalid_refresh_token",
            Err(_) => "error",
        };
        metrics::record_refresh_exchange(status);
        result
    }

    async fn exchange_inner(&self, access_token: &str, refresh_value: &str) -> Result<TokenPair, CredentialError> {
        let claims = self
            .validator
            .validate_token(access_token, ValidationMode::LifetimeExempt)
            .map_err(|_| CredentialError::InvalidAccessToken)?;

        let user_id = TokenValidator::resolve_token_value(&claims, CLAIM_USER_ID)
            .filter(|v| !v.is_empty())
            .ok_or(CredentialError::InvalidAccessToken)?;
        let user_name = TokenValidator::resolve_token_value(&claims, CLAIM_SUBJECT)
            .filter(|v| !v.is_empty())
            .ok_or(CredentialError::InvalidAccessToken)?;

        let previous_hash = value::digest(refresh_value);
        let mut entity = match self.repository.get(&user_id, &previous_hash).await? {
            Some(row) if row.is_active_at(Utc::now()) => row,
            Some(row) => {
                warn!(user_id = %user_id, row_id = %row.id, revoked = row.is_deleted, "Inactive refresh token presented");
                return Err(CredentialError::InvalidRefreshToken);
            }
            None => {
                warn!(user_id = %user_id, "Unknown refresh token presented");
                return Err(CredentialError::InvalidRefreshToken);
            }
        };

        let grants = self.roles.grants_for_user(&user_id).await?;
        let access_token = self
            .issuer
            .create_token(&user_id, &user_name, &grants.roles, &grants.scopes)?;

        let refresh_token = value::new_value();
        entity.rotate(value::digest(&refresh_token), self.expiry_from_now()?);

        if !self.repository.update(&entity, &previous_hash).await? {
            warn!(user_id = %user_id, row_id = %entity.id, "Refresh token already exchanged");
            return Err(CredentialError::InvalidRefreshToken);
        }

        info!(
            user_id = %user_id,
            row_id = %entity.id,
            rotation_count = entity.rotation_count,
            "Rotated refresh token"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Soft-delete the row holding `refresh_value`. Unknown values are ignored.
    pub async fn revoke(&self, user_id: &str, refresh_value: &str) -> Result<(), CredentialError> {
        let hash = value::digest(refresh_value);
        let Some(mut entity) = self.repository.get(user_id, &hash).await? else {
            return Ok(());
        };
        if entity.is_deleted {
            return Ok(());
        }

        entity.revoke();
        if self.repository.update(&entity, &hash).await? {
            info!(user_id = %user_id, row_id = %entity.id, "Revoked refresh token");
        }
        Ok(())
    }
}
