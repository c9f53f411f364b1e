//! Single-use opaque tokens for password reset and email confirmation.
//!
//! Raw tokens never leave the credential store unencoded; callers only see
//! the base64url transport form.

pub mod encoding;
pub mod flow;

pub use encoding::{decode_token, encode_token};
pub use flow::{Confirmation, ConfirmationFlow, ResetRequested, RESET_REQUESTED_MESSAGE};
