//! Access tokens: claims layout, scope codec, issuance and validation.

pub mod claims;
pub mod issuer;
pub mod scope;
pub mod validator;

pub use claims::TokenClaims;
pub use issuer::{AccessToken, TokenIssuer};
pub use scope::{Claim, ScopeClaim};
pub use validator::{TokenValidator, ValidationMode};
