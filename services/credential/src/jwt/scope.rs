//! `resource:action` scope claims.
//!
//! Neither half may contain the separator, so encoding and decoding are
//! inverse operations.

use crate::error::CredentialError;
use crate::jwt::claims::CLAIM_SCOPE;
use std::fmt;
use std::str::FromStr;

/// Separator between resource and action.
pub const SCOPE_SEPARATOR: char = ':';

/// A named claim as embedded in a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// Claim name.
    pub name: String,
    /// Claim value.
    pub value: String,
}

/// A fine-grained permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeClaim {
    resource: String,
    action: String,
}

impl ScopeClaim {
    /// Create a scope, rejecting empty halves and embedded separators.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidScope`] if either half is empty or
    /// contains [`SCOPE_SEPARATOR`].
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Result<Self, CredentialError> {
        let resource = resource.into();
        let action = action.into();
        for part in [&resource, &action] {
            if part.is_empty() || part.contains(SCOPE_SEPARATOR) {
                return Err(CredentialError::InvalidScope(format!("{}{}{}", resource, SCOPE_SEPARATOR, action)));
            }
        }
        Ok(Self { resource, action })
    }

    /// Resource half.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Action half.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The `scope` claim for this permission.
    #[must_use]
    pub fn to_claim(&self) -> Claim {
        Claim {
            name: CLAIM_SCOPE.to_string(),
            value: self.to_string(),
        }
    }
}

impl fmt::Display for ScopeClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.resource, SCOPE_SEPARATOR, self.action)
    }
}

impl FromStr for ScopeClaim {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s
            .split_once(SCOPE_SEPARATOR)
            .ok_or_else(|| CredentialError::InvalidScope(s.to_string()))?;
        if resource.is_empty() || action.is_empty() {
            return Err(CredentialError::InvalidScope(s.to_string()));
        }
        Ok(Self {
            resource: resource.to_string(),
            action: action.to_string(),
        })
    }
}

/// Encode a permission as a `scope` claim.
///
/// # Errors
///
/// Returns [`CredentialError::InvalidScope`] if either half is invalid.
pub fn encode(resource: &str, action: &str) -> Result<Claim, CredentialError> {
    ScopeClaim::new(resource, action).map(|scope| scope.to_claim())
}

/// Decode a `scope` claim, splitting on the first separator.
///
/// # Errors
///
/// Returns [`CredentialError::InvalidScope`] if the claim is not a scope
/// claim or lacks a separator.
pub fn decode(claim: &Claim) -> Result<ScopeClaim, CredentialError> {
    if claim.name != CLAIM_SCOPE {
        return Err(CredentialError::InvalidScope(format!("not a scope claim: {}", claim.name)));
    }
    claim.value.parse()
}
