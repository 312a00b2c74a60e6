//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] techmart_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// No bearer token on a protected route.
    #[error("missing bearer token")]
    MissingToken,

    /// Token is malformed, forged or for an unknown user.
    #[error("invalid token")]
    InvalidToken,

    /// Token signature is fine but `exp` has passed.
    #[error("token expired")]
    TokenExpired,

    /// The account was disabled by staff.
    #[error("account is disabled")]
    AccountDisabled,

    /// Authenticated, but not staff.
    #[error("admin access required")]
    NotAdmin,

    /// Reset token unknown, used or expired.
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    /// Google sign-in is not configured.
    #[error("google sign-in is not enabled")]
    GoogleDisabled,

    /// Google rejected the ID token or it was issued for another client.
    #[error("invalid google token")]
    GoogleTokenInvalid,

    /// Google could not be reached.
    #[error("google token verification failed: {0}")]
    GoogleUnavailable(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token signing error.
    #[error("token signing error")]
    TokenSigning,
}
