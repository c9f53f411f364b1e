//! Credential service library.
//!
//! Signs and verifies access tokens, publishes the verification key set,
//! rotates single-use refresh tokens and runs opaque-token password reset
//! and email confirmation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authz;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod http;
pub mod jwks;
pub mod jwt;
pub mod keys;
pub mod metrics;
pub mod observability;
pub mod refresh;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::CredentialError;
