//! Error types for the Portico system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PorticoError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

}

impl PorticoError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// `true` when the error is a lookup miss rather than an
    /// infrastructure failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type PorticoResult<T> = Result<T, PorticoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_classified() {
        let err = PorticoError::NotFound {
            entity: "tenant".into(),
            id: "acme".into(),
        };
        assert!(err.is_not_found());
        assert!(!PorticoError::Database("gone".into()).is_not_found());
    }

    #[test]
    fn validation_display() {
        let err = PorticoError::validation("email is malformed");
        assert_eq!(err.to_string(), "Validation error: email is malformed");
    }
}
