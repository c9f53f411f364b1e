//! Token pairs for freshly authenticated users.

use crate::error::CredentialError;
use crate::jwt::TokenIssuer;
use crate::refresh::{RefreshTokenRotator, TokenPair};
use crate::storage::RoleStore;
use std::sync::Arc;
use tracing::info;

/// Issues the first access/refresh pair after login or registration.
pub struct SessionIssuer {
    roles: Arc<dyn RoleStore>,
    issuer: Arc<TokenIssuer>,
    rotator: Arc<RefreshTokenRotator>,
}

impl SessionIssuer {
    /// Build from shared collaborators.
    pub fn new(roles: Arc<dyn RoleStore>, issuer: Arc<TokenIssuer>, rotator: Arc<RefreshTokenRotator>) -> Self {
        Self { roles, issuer, rotator }
    }

    /// Access token carrying the user's current grants, plus a new refresh value.
    ///
    /// # Errors
    ///
    /// Propagates role store, signing and repository failures.
    pub async fn issue_for_user(&self, user_id: &str, user_name: &str) -> Result<TokenPair, CredentialError> {
        let grants = self.roles.grants_for_user(user_id).await?;
        let access_token = self
            .issuer
            .create_token(user_id, user_name, &grants.roles, &grants.scopes)?;
        let refresh_token = self.rotator.issue_for(user_id).await?;

        info!(user_id = %user_id, roles = grants.roles.len(), "Session issued");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
