pub mod error;
pub mod verifier;

pub use error::AuthError;
pub(crate) use verifier::tokens_match;
pub use verifier::{Identity, IdentityVerifier, StaticTokenVerifier};
