//! Scope and role checks over validated claims.

use crate::jwt::claims::CLAIM_SCOPE;
use crate::jwt::scope::{self, Claim};
use crate::jwt::{ScopeClaim, TokenClaims};
use std::collections::BTreeSet;
use tracing::warn;

/// Action that grants every action on a resource.
pub const WILDCARD_ACTION: &str = "*";

/// The decoded scopes of one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSet {
    scopes: BTreeSet<ScopeClaim>,
}

impl ScopeSet {
    /// Decode every `scope` value; malformed values are skipped.
    pub fn from_claims(claims: &TokenClaims) -> Self {
        let scopes = claims
            .scope
            .iter()
            .filter_map(|value| {
                let claim = Claim {
                    name: CLAIM_SCOPE.to_string(),
                    value: value.clone(),
                };
                scope::decode(&claim)
                    .map_err(|e| warn!(token_id = %claims.jti, error = %e, "Ignoring malformed scope claim"))
                    .ok()
            })
            .collect();
        Self { scopes }
    }

    /// Whether `action` on `resource` is granted, directly or by wildcard.
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.scopes
            .iter()
            .any(|s| s.resource() == resource && (s.action() == action || s.action() == WILDCARD_ACTION))
    }

    /// Number of distinct scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether no scope was decoded.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

/// Whether the token carries `role`.
pub fn has_role(claims: &TokenClaims, role: &str) -> bool {
    claims.has_role(role)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(scopes: &[&str]) -> TokenClaims {
        TokenClaims::new("u1".to_string(), "alice".to_string(), 0, 300)
            .unwrap()
            .with_roles(vec!["admin".to_string()])
            .with_scopes(scopes.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn test_exact_scope_allows() {
        let set = ScopeSet::from_claims(&claims(&["user:edit"]));
        assert!(set.allows("user", "edit"));
        assert!(!set.allows("user", "delete"));
        assert!(!set.allows("order", "edit"));
    }

    #[test]
    fn test_wildcard_action() {
        let set = ScopeSet::from_claims(&claims(&["order:*"]));
        assert!(set.allows("order", "cancel"));
        assert!(!set.allows("user", "cancel"));
    }

    #[test]
    fn test_malformed_scopes_skipped() {
        let set = ScopeSet::from_claims(&claims(&["user:edit", "garbage", ":x", "y:"]));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_has_role() {
        let claims = claims(&[]);
        assert!(has_role(&claims, "admin"));
        assert!(!has_role(&claims, "auditor"));
    }
}
