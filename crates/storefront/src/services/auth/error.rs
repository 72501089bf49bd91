//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while issuing or verifying bearer tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header, or an empty token.
    #[error("no token provided")]
    MissingToken,

    /// Signature, structure or claims did not verify.
    #[error("invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// The token verified but its lifetime has passed.
    #[error("token expired")]
    Expired,

    /// The token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// The system clock is before the Unix epoch.
    #[error("system clock error")]
    Clock,
}
