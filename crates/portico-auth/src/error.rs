//! Authentication error types.

use portico_core::error::PorticoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email and wrong password are deliberately the same error.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("sign-ins are disabled for this tenant")]
    SigninsDisabled,

    /// Bad signature, malformed, or expired: callers never learn which.
    #[error("invalid or expired token")]
    TokenInvalid,

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for PorticoError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::SigninsDisabled
            | AuthError::TokenInvalid => PorticoError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::WeakPassword { .. } => PorticoError::validation(err.to_string()),
            AuthError::Crypto(msg) => PorticoError::Crypto(msg),
        }
    }
}
