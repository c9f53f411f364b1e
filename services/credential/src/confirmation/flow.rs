//! Password reset and email confirmation flows.

use crate::confirmation::encoding::{decode_token, encode_token};
use crate::error::CredentialError;
use crate::metrics;
use crate::storage::{CredentialStore, TokenDelivery, UserAccount};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reply to every reset request, whether or not the address is known.
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

const KIND_PASSWORD_RESET: &str = "password_reset";
const KIND_EMAIL_CONFIRMATION: &str = "email_confirmation";

/// Outcome of an opaque token check. Carries no cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    /// The token was live and matched.
    Confirmed,
    /// Anything else.
    NotConfirmed,
}

impl Confirmation {
    /// `true` for [`Confirmation::Confirmed`].
    pub const fn is_confirmed(self) -> bool {
        matches!(self, Confirmation::Confirmed)
    }
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::NotConfirmed
        }
    }
}

impl From<Confirmation> for bool {
    fn from(confirmation: Confirmation) -> Self {
        confirmation.is_confirmed()
    }
}

/// Reply to a reset request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetRequested {
    /// Always [`RESET_REQUESTED_MESSAGE`].
    pub message: String,
}

/// Password reset and email confirmation over single-use opaque tokens.
///
/// Every check fails closed: a decode error, an unknown user and a store
/// failure all read as [`Confirmation::NotConfirmed`].
pub struct ConfirmationFlow {
    store: Arc<dyn CredentialStore>,
    delivery: Arc<dyn TokenDelivery>,
}

impl ConfirmationFlow {
    /// Flow over `store`, sending tokens through `delivery`.
    pub fn new(store: Arc<dyn CredentialStore>, delivery: Arc<dyn TokenDelivery>) -> Self {
        ConfirmationFlow { store, delivery }
    }

    /// Send a reset token if `email` is registered. The reply never says which.
    pub async fn request_password_reset(&self, email: &str) -> ResetRequested {
        if let Err(e) = self.send_reset_token(email).await {
            warn!(error = %e, "Password reset request failed");
        }

        ResetRequested {
            message: RESET_REQUESTED_MESSAGE.to_string(),
        }
    }

    /// Check a reset token without consuming it.
    pub async fn confirm_reset_token(&self, user_id: &str, encoded_token: &str) -> Confirmation {
        let result = async {
            let user = self.user(user_id).await?;
            let raw = decode_token(encoded_token)?;
            self.store.validate_reset_token(&user, &raw).await
        }
        .await;

        settle(KIND_PASSWORD_RESET, user_id, result)
    }

    /// Replace the password and consume the reset token.
    pub async fn update_password(&self, user_id: &str, encoded_token: &str, new_password: &str) -> Confirmation {
        let result = async {
            let user = self.user(user_id).await?;
            let raw = decode_token(encoded_token)?;
            self.store.reset_password(&user, &raw, new_password).await
        }
        .await;

        settle(KIND_PASSWORD_RESET, user_id, result)
    }

    /// Mint an email confirmation token and hand it to delivery.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Storage`] if the user is unknown or the
    /// store or delivery fails.
    pub async fn request_email_confirmation(&self, user_id: &str) -> Result<(), CredentialError> {
        let user = self.user(user_id).await?;
        let raw = self.store.generate_email_confirmation_token(&user).await?;
        self.delivery
            .deliver_email_confirmation(&user, &encode_token(&raw))
            .await?;

        debug!(user_id = %user.id, "Email confirmation token issued");
        Ok(())
    }

    /// Mark the address confirmed and consume the token.
    pub async fn confirm_email(&self, user_id: &str, encoded_token: &str) -> Confirmation {
        let result = async {
            let user = self.user(user_id).await?;
            let raw = decode_token(encoded_token)?;
            self.store.confirm_email(&user, &raw).await
        }
        .await;

        settle(KIND_EMAIL_CONFIRMATION, user_id, result)
    }

    async fn send_reset_token(&self, email: &str) -> Result<(), CredentialError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let raw = self.store.generate_reset_token(&user).await?;
        self.delivery.deliver_reset_token(&user, &encode_token(&raw)).await?;

        debug!(user_id = %user.id, "Password reset token issued");
        Ok(())
    }

    async fn user(&self, user_id: &str) -> Result<UserAccount, CredentialError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| CredentialError::storage("User not found"))
    }
}

fn settle(kind: &str, user_id: &str, result: Result<bool, CredentialError>) -> Confirmation {
    let confirmation = match result {
        Ok(confirmed) => Confirmation::from(confirmed),
        Err(e) => {
            debug!(kind, user_id = %user_id, error = %e, "Confirmation failed");
            Confirmation::NotConfirmed
        }
    };
    metrics::record_confirmation(kind, confirmation.is_confirmed());
    confirmation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DeliveryKind, InMemoryCredentialStore, RecordingDelivery};

    async fn flow() -> (ConfirmationFlow, Arc<RecordingDelivery>) {
        let store = Arc::new(InMemoryCredentialStore::new());
        store
            .add_user("u1", "alice", "alice@example.com", "old-password")
            .await
            .unwrap();
        let delivery = Arc::new(RecordingDelivery::new());
        (ConfirmationFlow::new(store, delivery.clone()), delivery)
    }

    #[tokio::test]
    async fn test_reset_round_trip() {
        let (flow, delivery) = flow().await;
        flow.request_password_reset("alice@example.com").await;
        let encoded = delivery.last_token("u1", DeliveryKind::PasswordReset).await.unwrap();

        assert_eq!(flow.confirm_reset_token("u1", &encoded).await, Confirmation::Confirmed);
        assert_eq!(
            flow.update_password("u1", &encoded, "new-password").await,
            Confirmation::Confirmed
        );
        assert_eq!(
            flow.update_password("u1", &encoded, "newer-password").await,
            Confirmation::NotConfirmed
        );
    }

    #[tokio::test]
    async fn test_generic_message_for_unknown_email() {
        let (flow, delivery) = flow().await;
        let known = flow.request_password_reset("alice@example.com").await;
        let unknown = flow.request_password_reset("nobody@example.com").await;

        assert_eq!(known, unknown);
        assert_eq!(delivery.sent_count().await, 1);
    }

    #[tokio::test]
    async fn test_fails_closed() {
        let (flow, delivery) = flow().await;
        flow.request_password_reset("alice@example.com").await;
        let encoded = delivery.last_token("u1", DeliveryKind::PasswordReset).await.unwrap();

        assert_eq!(flow.confirm_reset_token("u1", "%%%").await, Confirmation::NotConfirmed);
        assert_eq!(flow.confirm_reset_token("u2", &encoded).await, Confirmation::NotConfirmed);
        assert_eq!(
            flow.confirm_reset_token("u1", &encode_token("wrong")).await,
            Confirmation::NotConfirmed
        );
    }

    #[tokio::test]
    async fn test_email_confirmation() {
        let (flow, delivery) = flow().await;
        flow.request_email_confirmation("u1").await.unwrap();
        let encoded = delivery
            .last_token("u1", DeliveryKind::EmailConfirmation)
            .await
            .unwrap();

        assert_eq!(flow.confirm_email("u1", &encoded).await, Confirmation::Confirmed);
        assert_eq!(flow.confirm_email("u1", &encoded).await, Confirmation::NotConfirmed);
        assert!(flow.request_email_confirmation("missing").await.is_err());
    }

    #[test]
    fn test_confirmation_converts_to_bool() {
        assert!(bool::from(Confirmation::Confirmed));
        assert!(!bool::from(Confirmation::NotConfirmed));
    }
}
