//! Single-use refresh values bound to a user, rotated on every exchange.

pub mod entity;
pub mod rotator;
pub mod value;

pub use entity::RefreshToken;
pub use rotator::{RefreshTokenRotator, TokenPair};
