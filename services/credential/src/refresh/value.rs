//! Refresh values and the digests stored in their place.
//!
//! A value reaches the client once and is never persisted. Rows hold only
//! its [`digest`], so every lookup hashes the presented value first.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes behind each refresh value.
pub const REFRESH_VALUE_BYTES: usize = 32;

/// Fresh refresh value, base64url without padding.
#[must_use]
pub fn new_value() -> String {
    let mut bytes = [0u8; REFRESH_VALUE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lookup key for a presented value.
#[must_use]
pub fn digest(value: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use std::collections::HashSet;

    #[test]
    fn test_value_carries_full_entropy() {
        let value = new_value();
        assert_eq!(URL_SAFE_NO_PAD.decode(&value).unwrap().len(), REFRESH_VALUE_BYTES);
        assert!(!value.contains(['+', '/', '=']));
    }

    #[test]
    fn test_values_do_not_repeat() {
        let values: HashSet<String> = (0..256).map(|_| new_value()).collect();
        assert_eq!(values.len(), 256);
    }

    #[test]
    fn test_digest_hides_value() {
        let value = new_value();
        assert_eq!(digest(&value), digest(&value));
        assert_ne!(digest(&value), value);
        assert_ne!(digest(&value), digest(&new_value()));
    }
}
