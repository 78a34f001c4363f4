use thiserror::Error;

/// Authentication errors returned while validating a connection's bearer
/// token. All variants are fatal to the connection attempt: the socket is
/// refused before any session state is created, and the client must
/// reconnect with a fresh token.
///
/// `ProviderUnavailable` is not produced by the in-memory
/// `StaticTokenVerifier` but is kept so that error handling stays stable
/// when an external identity-provider backend is plugged in.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    /// Reserved for verifier backends that call out to a remote identity
    /// provider.
    #[error("Identity provider unreachable")]
    ProviderUnavailable,
}
