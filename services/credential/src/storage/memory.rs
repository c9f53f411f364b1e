//! In-memory storage.
//!
//! Each read-modify-write runs under one write guard, which is what makes
//! the conditional refresh update exclusive.

use crate::error::CredentialError;
use crate::jwt::ScopeClaim;
use crate::refresh::RefreshToken;
use crate::storage::{CredentialStore, RefreshTokenRepository, RoleStore, TokenDelivery, UserAccount};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use subtle::ConstantTimeEq;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

const OPAQUE_TOKEN_LENGTH: usize = 48;

/// Deliveries a [`RecordingDelivery`] retains before dropping the oldest.
pub const RECORDED_DELIVERY_LIMIT: usize = 256;

/// Refresh token rows keyed by row id.
#[derive(Default)]
pub struct InMemoryRefreshTokenRepository {
    rows: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row belonging to `user_id`.
    pub async fn rows_for_user(&self, user_id: &str) -> Vec<RefreshToken> {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn get(&self, user_id: &str, token_hash: &str) -> Result<Option<RefreshToken>, CredentialError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|row| row.matches(user_id, token_hash))
            .cloned())
    }

    async fn create(&self, entity: &RefreshToken) -> Result<(), CredentialError> {
        let mut rows = self.rows.write().await;
        let now = Utc::now();
        let before = rows.len();
        rows.retain(|_, row| row.expires > now);
        if rows.len() < before {
            debug!(purged = before - rows.len(), "Purged expired refresh tokens");
        }

        if rows.contains_key(&entity.id) {
            return Err(CredentialError::storage(format!("Refresh token row {} already exists", entity.id)));
        }
        rows.insert(entity.id.clone(), entity.clone());
        Ok(())
    }

    async fn update(&self, entity: &RefreshToken, expected_hash: &str) -> Result<bool, CredentialError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&entity.id) {
            Some(row) if row.token_hash == expected_hash => {
                *row = entity.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(CredentialError::storage(format!("Refresh token row {} not found", entity.id))),
        }
    }
}

struct StoredUser {
    account: UserAccount,
    password_hash: String,
    reset_token: Option<String>,
    email_token: Option<String>,
}

/// Users with Argon2id password hashes and at most one live token of each kind.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, StoredUser>>,
}

impl InMemoryCredentialStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return its account.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Internal`] if the password cannot be hashed.
    pub async fn add_user(
        &self,
        user_id: &str,
        user_name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserAccount, CredentialError> {
        let account = UserAccount {
            id: user_id.to_string(),
            user_name: user_name.to_string(),
            email: email.to_string(),
            email_confirmed: false,
        };
        let password_hash = hash_password(password)?;

        self.users.write().await.insert(
            user_id.to_string(),
            StoredUser {
                account: account.clone(),
                password_hash,
                reset_token: None,
                email_token: None,
            },
        );
        Ok(account)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserAccount>, CredentialError> {
        Ok(self.users.read().await.get(user_id).map(|u| u.account.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, CredentialError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.account.email.eq_ignore_ascii_case(email))
            .map(|u| u.account.clone()))
    }

    async fn verify_password(&self, user: &UserAccount, password: &str) -> Result<bool, CredentialError> {
        let stored_hash = match self.users.read().await.get(&user.id) {
            Some(u) => u.password_hash.clone(),
            None => return Ok(false),
        };
        verify_password_hash(password, &stored_hash)
    }

    async fn generate_reset_token(&self, user: &UserAccount) -> Result<String, CredentialError> {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| CredentialError::storage(format!("User {} not found", user.id)))?;
        let token = random_token(OPAQUE_TOKEN_LENGTH);
        stored.reset_token = Some(token.clone());
        Ok(token)
    }

    async fn validate_reset_token(&self, user: &UserAccount, raw_token: &str) -> Result<bool, CredentialError> {
        let users = self.users.read().await;
        Ok(users
            .get(&user.id)
            .and_then(|u| u.reset_token.as_deref())
            .is_some_and(|live| constant_time_eq(live, raw_token)))
    }

    async fn reset_password(
        &self,
        user: &UserAccount,
        raw_token: &str,
        new_password: &str,
    ) -> Result<bool, CredentialError> {
        let password_hash = hash_password(new_password)?;

        let mut users = self.users.write().await;
        let Some(stored) = users.get_mut(&user.id) else {
            return Ok(false);
        };
        let live = stored
            .reset_token
            .as_deref()
            .is_some_and(|live| constant_time_eq(live, raw_token));
        if !live {
            return Ok(false);
        }

        stored.password_hash = password_hash;
        stored.reset_token = None;
        Ok(true)
    }

    async fn generate_email_confirmation_token(&self, user: &UserAccount) -> Result<String, CredentialError> {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| CredentialError::storage(format!("User {} not found", user.id)))?;
        let token = random_token(OPAQUE_TOKEN_LENGTH);
        stored.email_token = Some(token.clone());
        Ok(token)
    }

    async fn confirm_email(&self, user: &UserAccount, raw_token: &str) -> Result<bool, CredentialError> {
        let mut users = self.users.write().await;
        let Some(stored) = users.get_mut(&user.id) else {
            return Ok(false);
        };
        let live = stored
            .email_token
            .as_deref()
            .is_some_and(|live| constant_time_eq(live, raw_token));
        if live {
            stored.account.email_confirmed = true;
            stored.email_token = None;
        }
        Ok(live)
    }
}

/// Role assignments and the scopes each role grants.
#[derive(Default)]
pub struct InMemoryRoleStore {
    user_roles: RwLock<HashMap<String, Vec<String>>>,
    role_scopes: RwLock<HashMap<String, Vec<ScopeClaim>>>,
}

impl InMemoryRoleStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roles assigned to a user.
    pub async fn assign_roles(&self, user_id: &str, roles: &[&str]) {
        self.user_roles
            .write()
            .await
            .insert(user_id.to_string(), roles.iter().map(|r| (*r).to_string()).collect());
    }

    /// Replace the scopes granted by a role.
    pub async fn grant_scopes(&self, role: &str, scopes: Vec<ScopeClaim>) {
        self.role_scopes.write().await.insert(role.to_string(), scopes);
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn roles_for_user(&self, user_id: &str) -> Result<Vec<String>, CredentialError> {
        Ok(self.user_roles.read().await.get(user_id).cloned().unwrap_or_default())
    }

    async fn scopes_for_roles(&self, roles: &[String]) -> Result<Vec<ScopeClaim>, CredentialError> {
        let role_scopes = self.role_scopes.read().await;
        Ok(roles
            .iter()
            .filter_map(|role| role_scopes.get(role))
            .flatten()
            .cloned()
            .collect())
    }
}

/// Kind of opaque token handed to a [`TokenDelivery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryKind {
    /// Password reset link.
    PasswordReset,
    /// Email confirmation link.
    EmailConfirmation,
}

/// Logs that a token went out and keeps nothing.
///
/// Stands in for a mail sender when the service runs without one.
#[derive(Debug, Default)]
pub struct LoggingDelivery;

impl LoggingDelivery {
    /// New delivery.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TokenDelivery for LoggingDelivery {
    async fn deliver_reset_token(&self, user: &UserAccount, _encoded_token: &str) -> Result<(), CredentialError> {
        log_skipped(user, DeliveryKind::PasswordReset);
        Ok(())
    }

    async fn deliver_email_confirmation(
        &self,
        user: &UserAccount,
        _encoded_token: &str,
    ) -> Result<(), CredentialError> {
        log_skipped(user, DeliveryKind::EmailConfirmation);
        Ok(())
    }
}

fn log_skipped(user: &UserAccount, kind: DeliveryKind) {
    info!(user_id = %user.id, kind = ?kind, "Token delivery skipped, no mail sender configured");
}

/// Keeps the most recent [`RECORDED_DELIVERY_LIMIT`] deliveries in memory
/// so tests can read the tokens back.
#[derive(Default)]
pub struct RecordingDelivery {
    sent: Mutex<VecDeque<(String, DeliveryKind, String)>>,
}

impl RecordingDelivery {
    /// Empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent encoded token of `kind` sent to `user_id`.
    pub async fn last_token(&self, user_id: &str, kind: DeliveryKind) -> Option<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|(user, k, _)| user == user_id && *k == kind)
            .map(|(_, _, token)| token.clone())
    }

    /// Number of deliveries retained.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    async fn record(&self, user: &UserAccount, kind: DeliveryKind, encoded_token: &str) {
        info!(user_id = %user.id, kind = ?kind, "Recorded token delivery");
        let mut sent = self.sent.lock().await;
        if sent.len() == RECORDED_DELIVERY_LIMIT {
            sent.pop_front();
        }
        sent.push_back((user.id.clone(), kind, encoded_token.to_string()));
    }
}

#[async_trait]
impl TokenDelivery for RecordingDelivery {
    async fn deliver_reset_token(&self, user: &UserAccount, encoded_token: &str) -> Result<(), CredentialError> {
        self.record(user, DeliveryKind::PasswordReset, encoded_token).await;
        Ok(())
    }

    async fn deliver_email_confirmation(&self, user: &UserAccount, encoded_token: &str) -> Result<(), CredentialError> {
        self.record(user, DeliveryKind::EmailConfirmation, encoded_token).await;
        Ok(())
    }
}

fn random_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Argon2id PHC string for `password` with a fresh salt.
fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::internal(format!("Password hashing failed: {}", e)))
}

fn verify_password_hash(password: &str, phc: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(phc)
        .map_err(|e| CredentialError::storage(format!("Stored password hash is malformed: {}", e)))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
