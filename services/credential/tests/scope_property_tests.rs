//! Property-based tests for `resource:action` scope claims.

use credential_service::authz::ScopeSet;
use credential_service::jwt::claims::CLAIM_SCOPE;
use credential_service::jwt::scope::{decode, encode};
use credential_service::jwt::{Claim, TokenClaims};
use credential_service::CredentialError;
use proptest::prelude::*;

/// Generate separator-free scope halves.
fn arb_part() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.*-]{1,24}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Decoding an encoded scope yields the original halves.
    #[test]
    fn prop_encode_decode_inverse(resource in arb_part(), action in arb_part()) {
        let claim = encode(&resource, &action).unwrap();
        prop_assert_eq!(&claim.name, CLAIM_SCOPE);
        prop_assert_eq!(claim.value.clone(), format!("{}:{}", resource, action));

        let scope = decode(&claim).unwrap();
        prop_assert_eq!(scope.resource(), resource.as_str());
        prop_assert_eq!(scope.action(), action.as_str());
    }

    /// Halves containing the separator cannot be encoded.
    #[test]
    fn prop_separator_in_half_rejected(left in arb_part(), right in arb_part()) {
        let embedded = format!("{}:{}", left, right);
        prop_assert!(matches!(encode(&embedded, "read"), Err(CredentialError::InvalidScope(_))));
        prop_assert!(matches!(encode("user", &embedded), Err(CredentialError::InvalidScope(_))));
    }

    /// Values without a separator do not decode.
    #[test]
    fn prop_missing_separator_rejected(value in "[a-zA-Z0-9_-]{0,24}") {
        let claim = Claim { name: CLAIM_SCOPE.to_string(), value };
        prop_assert!(decode(&claim).is_err());
    }

    /// Every granted scope is allowed by the decoded set.
    #[test]
    fn prop_granted_scopes_allowed(scopes in prop::collection::vec((arb_part(), arb_part()), 1..6)) {
        let encoded = scopes
            .iter()
            .map(|(r, a)| encode(r, a).unwrap().value)
            .collect();
        let claims = TokenClaims::new("u1".to_string(), "alice".to_string(), 0, 60).unwrap().with_scopes(encoded);

        let set = ScopeSet::from_claims(&claims);
        for (resource, action) in &scopes {
            prop_assert!(set.allows(resource, action));
        }
    }
}

#[test]
fn test_decode_wrong_claim_name() {
    let claim = Claim {
        name: "rol".to_string(),
        value: "user:edit".to_string(),
    };
    assert!(matches!(decode(&claim), Err(CredentialError::InvalidScope(_))));
}
