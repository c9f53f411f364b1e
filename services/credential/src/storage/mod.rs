//! Storage collaborators.
//!
//! The credential core talks to persistence and the identity store only
//! through these traits. [`memory`] holds in-process implementations used by
//! the binary and the tests.

pub mod memory;

pub use memory::{
    DeliveryKind, InMemoryCredentialStore, InMemoryRefreshTokenRepository, InMemoryRoleStore, LoggingDelivery,
    RecordingDelivery, RECORDED_DELIVERY_LIMIT,
};

use crate::error::CredentialError;
use crate::jwt::ScopeClaim;
use crate::refresh::RefreshToken;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Refresh token rows keyed by user and token digest.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Row matching `(user_id, token_hash)`, deleted rows included.
    async fn get(&self, user_id: &str, token_hash: &str) -> Result<Option<RefreshToken>, CredentialError>;

    /// Insert a new row.
    async fn create(&self, entity: &RefreshToken) -> Result<(), CredentialError>;

    /// Replace the row with `entity.id` if its stored digest still equals
    /// `expected_hash`. Returns `false` when another writer got there first.
    async fn update(&self, entity: &RefreshToken, expected_hash: &str) -> Result<bool, CredentialError>;
}

/// A user as seen by the credential core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAccount {
    /// Stable user id.
    pub id: String,
    /// User name, used as `sub`.
    pub user_name: String,
    /// Login address.
    pub email: String,
    /// Whether the address was confirmed.
    pub email_confirmed: bool,
}

/// Identity store capabilities: lookup, passwords and opaque tokens.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// User by id.
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserAccount>, CredentialError>;

    /// User by address, case-insensitive.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, CredentialError>;

    /// Whether `password` matches the stored hash.
    async fn verify_password(&self, user: &UserAccount, password: &str) -> Result<bool, CredentialError>;

    /// Mint and persist a fresh raw reset token, replacing any previous one.
    async fn generate_reset_token(&self, user: &UserAccount) -> Result<String, CredentialError>;

    /// Whether `raw_token` is the live reset token for `user`.
    async fn validate_reset_token(&self, user: &UserAccount, raw_token: &str) -> Result<bool, CredentialError>;

    /// Set a new password if `raw_token` is the live reset token; consumes it.
    async fn reset_password(
        &self,
        user: &UserAccount,
        raw_token: &str,
        new_password: &str,
    ) -> Result<bool, CredentialError>;

    /// Mint and persist a fresh raw email token, replacing any previous one.
    async fn generate_email_confirmation_token(&self, user: &UserAccount) -> Result<String, CredentialError>;

    /// Mark the address confirmed if `raw_token` is live; consumes it.
    async fn confirm_email(&self, user: &UserAccount, raw_token: &str) -> Result<bool, CredentialError>;
}

/// Roles and scopes currently granted to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grants {
    /// Role names.
    pub roles: Vec<String>,
    /// Encoded scopes, sorted.
    pub scopes: Vec<String>,
}

/// Role assignments and the scopes each role grants.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Roles assigned to `user_id`.
    async fn roles_for_user(&self, user_id: &str) -> Result<Vec<String>, CredentialError>;

    /// Scopes granted by any of `roles`, duplicates allowed.
    async fn scopes_for_roles(&self, roles: &[String]) -> Result<Vec<ScopeClaim>, CredentialError>;

    /// Current roles plus the de-duplicated, encoded scopes they grant.
    async fn grants_for_user(&self, user_id: &str) -> Result<Grants, CredentialError> {
        let roles = self.roles_for_user(user_id).await?;
        let scopes: BTreeSet<String> = self
            .scopes_for_roles(&roles)
            .await?
            .iter()
            .map(|scope| scope.to_claim().value)
            .collect();

        Ok(Grants {
            roles,
            scopes: scopes.into_iter().collect(),
        })
    }
}

/// Hands encoded opaque tokens to the user out of band (e-mail).
#[async_trait]
pub trait TokenDelivery: Send + Sync {
    /// Send a password reset token.
    async fn deliver_reset_token(&self, user: &UserAccount, encoded_token: &str) -> Result<(), CredentialError>;

    /// Send an email confirmation token.
    async fn deliver_email_confirmation(&self, user: &UserAccount, encoded_token: &str) -> Result<(), CredentialError>;
}
