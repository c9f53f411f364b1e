//! Claims carried by access tokens.

use crate::error::CredentialError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Subject (user name).
pub const CLAIM_SUBJECT: &str = "sub";
/// Unique token id.
pub const CLAIM_TOKEN_ID: &str = "jti";
/// Issued-at, unix seconds.
pub const CLAIM_ISSUED_AT: &str = "iat";
/// Expiry, unix seconds.
pub const CLAIM_EXPIRES: &str = "exp";
/// Issuer.
pub const CLAIM_ISSUER: &str = "iss";
/// Audience.
pub const CLAIM_AUDIENCE: &str = "aud";
/// User id.
pub const CLAIM_USER_ID: &str = "id";
/// Role claim, one value per role.
pub const CLAIM_ROLE: &str = "rol";
/// Scope claim, one `resource:action` value per scope.
pub const CLAIM_SCOPE: &str = "scope";

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// User name.
    #[serde(default)]
    pub sub: String,
    /// Random token id.
    #[serde(default)]
    pub jti: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,

    /// Issuer, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// User id.
    #[serde(default)]
    pub id: String,
    /// Role names. A single string is accepted on read.
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub rol: Vec<String>,
    /// Encoded `resource:action` scopes. A single string is accepted on read.
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,

    /// Any other claims.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenClaims {
    /// Claims for a fresh token issued at `issued_at` and valid for `ttl_seconds`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Internal`] if the expiry does not fit in a timestamp.
    pub fn new(user_id: String, user_name: String, issued_at: i64, ttl_seconds: i64) -> Result<Self, CredentialError> {
        let exp = issued_at
            .checked_add(ttl_seconds)
            .ok_or_else(|| CredentialError::internal("Token expiry overflows"))?;

        Ok(TokenClaims {
            sub: user_name,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: issued_at,
            exp,
            iss: None,
            aud: None,
            id: user_id,
            rol: Vec::new(),
            scope: Vec::new(),
            extra: HashMap::new(),
        })
    }

    /// Set `iss`.
    #[must_use]
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.iss = issuer;
        self
    }

    /// Set `aud`.
    #[must_use]
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.aud = audience;
        self
    }

    /// Set `rol`.
    #[must_use]
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.rol = roles;
        self
    }

    /// Set `scope`.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scope = scopes;
        self
    }

    /// Whether `exp` has passed at `timestamp`.
    pub fn is_expired_at(&self, timestamp: i64) -> bool {
        self.exp <= timestamp
    }

    /// Whether `rol` contains `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.rol.iter().any(|r| r == role)
    }

    /// Single named claim value, or `None` when absent or empty.
    ///
    /// Multi-valued claims resolve to their first value.
    pub fn resolve(&self, claim_name: &str) -> Option<String> {
        let value = match claim_name {
            CLAIM_SUBJECT => Some(self.sub.clone()),
            CLAIM_TOKEN_ID => Some(self.jti.clone()),
            CLAIM_ISSUED_AT => Some(self.iat.to_string()),
            CLAIM_EXPIRES => Some(self.exp.to_string()),
            CLAIM_ISSUER => self.iss.clone(),
            CLAIM_AUDIENCE => self.aud.clone(),
            CLAIM_USER_ID => Some(self.id.clone()),
            CLAIM_ROLE => self.rol.first().cloned(),
            CLAIM_SCOPE => self.scope.first().cloned(),
            other => match self.extra.get(other) {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(serde_json::Value::Array(values)) => values
                    .first()
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                Some(serde_json::Value::Null) | None => None,
                Some(value) => Some(value.to_string()),
            },
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Accept either a single string or an array of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let claims = TokenClaims::new("u1".to_string(), "alice".to_string(), 1_000, 300).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.id, "u1");
        assert_eq!(claims.exp, 1_300);
        assert!(!claims.is_expired_at(1_299));
        assert!(claims.is_expired_at(1_300));
    }

    #[test]
    fn test_overflowing_expiry_rejected() {
        let result = TokenClaims::new("u1".to_string(), "alice".to_string(), 1_000, i64::MAX);
        assert!(matches!(result, Err(CredentialError::Internal(_))));
    }

    #[test]
    fn test_unique_token_ids() {
        let a = TokenClaims::new("u1".to_string(), "alice".to_string(), 0, 300).unwrap();
        let b = TokenClaims::new("u1".to_string(), "alice".to_string(), 0, 300).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_single_role_string_accepted() {
        let claims: TokenClaims = serde_json::from_value(serde_json::json!({
            "sub": "alice", "jti": "j", "iat": 1, "exp": 2, "id": "u1",
            "rol": "admin", "scope": ["user:edit", "user:read"]
        }))
        .unwrap();

        assert_eq!(claims.rol, vec!["admin".to_string()]);
        assert_eq!(claims.scope.len(), 2);
        assert!(claims.has_role("admin"));
    }

    #[test]
    fn test_resolve_claims() {
        let mut claims = TokenClaims::new("u1".to_string(), "alice".to_string(), 10, 300)
            .unwrap()
            .with_roles(vec!["svc:role".to_string()])
            .with_scopes(vec!["user:edit".to_string()]);
        claims
            .extra
            .insert("tenant".to_string(), serde_json::Value::String("acme".to_string()));

        assert_eq!(claims.resolve(CLAIM_USER_ID).as_deref(), Some("u1"));
        assert_eq!(claims.resolve(CLAIM_SUBJECT).as_deref(), Some("alice"));
        assert_eq!(claims.resolve(CLAIM_ISSUED_AT).as_deref(), Some("10"));
        assert_eq!(claims.resolve(CLAIM_ROLE).as_deref(), Some("svc:role"));
        assert_eq!(claims.resolve(CLAIM_SCOPE).as_deref(), Some("user:edit"));
        assert_eq!(claims.resolve("tenant").as_deref(), Some("acme"));
        assert_eq!(claims.resolve(CLAIM_ISSUER), None);
        assert_eq!(claims.resolve("missing"), None);
    }

    #[test]
    fn test_empty_values_resolve_to_none() {
        let claims = TokenClaims::new(String::new(), "alice".to_string(), 0, 300).unwrap();
        assert_eq!(claims.resolve(CLAIM_USER_ID), None);
    }
}
