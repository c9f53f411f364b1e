//! Persisted refresh token rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted refresh token row.
///
/// Only the digest of the token value is stored. A row keeps its id across
/// rotations; each rotation replaces the digest and expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshToken {
    /// Row id, stable across rotations.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Digest of the current value.
    pub token_hash: String,
    /// End of the current value's lifetime.
    pub expires: DateTime<Utc>,
    /// Audit: creating user.
    pub created_by: String,
    /// Audit: creation time.
    pub created_at: DateTime<Utc>,
    /// Audit: user behind the last change.
    pub updated_by: Option<String>,
    /// Audit: time of the last change.
    pub updated_at: Option<DateTime<Utc>>,
    /// Soft-delete flag set by revocation.
    pub is_deleted: bool,
    /// Completed exchanges.
    pub rotation_count: u32,
}

impl RefreshToken {
    /// New row with a random id.
    pub fn new(user_id: String, token_hash: String, expires: DateTime<Utc>) -> Self {
        RefreshToken {
            id: uuid::Uuid::new_v4().to_string(),
            created_by: user_id.clone(),
            user_id,
            token_hash,
            expires,
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
            is_deleted: false,
            rotation_count: 0,
        }
    }

    /// Replace the digest and expiry after an exchange.
    pub fn rotate(&mut self, new_token_hash: String, expires: DateTime<Utc>) {
        self.token_hash = new_token_hash;
        self.expires = expires;
        self.rotation_count += 1;
        self.updated_by = Some(self.user_id.clone());
        self.updated_at = Some(Utc::now());
    }

    /// Mark the row deleted.
    pub fn revoke(&mut self) {
        self.is_deleted = true;
        self.updated_by = Some(self.user_id.clone());
        self.updated_at = Some(Utc::now());
    }

    /// Whether this row can authenticate an exchange at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_deleted && self.expires > now
    }

    /// Whether the row belongs to `user_id` and holds `token_hash`.
    pub fn matches(&self, user_id: &str, token_hash: &str) -> bool {
        self.user_id == user_id && self.token_hash == token_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row() -> RefreshToken {
        RefreshToken::new(
            "user-1".to_string(),
            "hash-1".to_string(),
            Utc::now() + Duration::days(7),
        )
    }

    #[test]
    fn test_refresh_token_creation() {
        let token = row();

        assert_eq!(token.rotation_count, 0);
        assert_eq!(token.created_by, "user-1");
        assert!(token.is_active_at(Utc::now()));
        assert!(token.matches("user-1", "hash-1"));
    }

    #[test]
    fn test_rotation_replaces_hash() {
        let mut token = row();
        let id = token.id.clone();
        token.rotate("hash-2".to_string(), Utc::now() + Duration::days(7));

        assert_eq!(token.rotation_count, 1);
        assert_eq!(token.id, id);
        assert!(!token.matches("user-1", "hash-1"));
        assert!(token.matches("user-1", "hash-2"));
        assert!(token.updated_at.is_some());
    }

    #[test]
    fn test_revocation() {
        let mut token = row();
        token.revoke();

        assert!(token.is_deleted);
        assert!(!token.is_active_at(Utc::now()));
    }

    #[test]
    fn test_expired_row_inactive() {
        let mut token = row();
        token.expires = Utc::now() - Duration::seconds(1);
        assert!(!token.is_active_at(Utc::now()));
    }
}
