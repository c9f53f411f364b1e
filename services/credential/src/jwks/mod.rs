//! Public key-set document served at `GET /keys`.

pub mod publisher;

pub use publisher::{JsonWebKey, JsonWebKeySet, JwksPublisher, ED25519_CURVE};
