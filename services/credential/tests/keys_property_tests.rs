//! Property-based tests for key material resolution.

use credential_service::config::{KeyEnvironment, KeySetOptions};
use credential_service::keys::{KeyMaterialProvider, KeySource, MIN_SECRET_LENGTH};
use credential_service::CredentialError;
use proptest::prelude::*;

fn options(secret: &str) -> KeySetOptions {
    KeySetOptions {
        secret_key: Some(secret.to_string()),
        ..KeySetOptions::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Secrets below the minimum length are fatal.
    #[test]
    fn prop_short_secret_rejected(secret in "[a-zA-Z0-9]{1,31}") {
        let result = KeyMaterialProvider::new(&options(&secret), &KeyEnvironment::default());
        prop_assert!(matches!(result, Err(CredentialError::SigningKeyInvalid(_))));
    }

    /// Secrets at or above the minimum pass through unchanged.
    #[test]
    fn prop_long_secret_unchanged(secret in "[a-zA-Z0-9!@#$%^&*]{32,96}") {
        let provider = KeyMaterialProvider::new(&options(&secret), &KeyEnvironment::default()).unwrap();
        prop_assert_eq!(provider.secret_key(), secret.as_str());
        prop_assert_eq!(provider.secret_source(), KeySource::Configuration);
    }

    /// Length counts characters, not bytes.
    #[test]
    fn prop_length_counts_characters(n in 16usize..MIN_SECRET_LENGTH) {
        let secret = "é".repeat(n);
        prop_assert!(secret.len() >= MIN_SECRET_LENGTH);
        let result = KeyMaterialProvider::new(&options(&secret), &KeyEnvironment::default());
        prop_assert!(result.is_err());
    }

    /// An environment secret always wins over the configured one.
    #[test]
    fn prop_environment_secret_wins(
        configured in "[a-z]{32,48}",
        overriding in "[A-Z]{32,48}",
    ) {
        let environment = KeyEnvironment {
            key_id: None,
            secret_key: Some(overriding.clone()),
        };
        let provider = KeyMaterialProvider::new(&options(&configured), &environment).unwrap();
        prop_assert_eq!(provider.secret_key(), overriding.as_str());
        prop_assert_eq!(provider.secret_source(), KeySource::Environment);
    }
}

#[test]
fn test_short_environment_secret_not_masked_by_configuration() {
    let environment = KeyEnvironment {
        key_id: None,
        secret_key: Some("too-short".to_string()),
    };
    let result = KeyMaterialProvider::new(&options("0123456789012345678901234567890X"), &environment);
    assert!(matches!(result, Err(CredentialError::SigningKeyInvalid(_))));
}

#[test]
fn test_mismatched_key_type_rejected() {
    let options = KeySetOptions {
        alg: Some("HS256".to_string()),
        key_type: Some("OKP".to_string()),
        ..options("0123456789012345678901234567890X")
    };
    let result = KeyMaterialProvider::new(&options, &KeyEnvironment::default());
    assert!(matches!(result, Err(CredentialError::Config(_))));
}
