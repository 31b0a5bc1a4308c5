//! Database-specific error types and conversions.

use portico_core::error::PorticoError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unique index {index} rejected the write")]
    UniqueViolation { index: String },

    #[error("Stored value is corrupt: {0}")]
    Corrupt(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    /// Classify an error returned by `Response::check()`.
    ///
    /// SurrealDB reports unique-index violations only through the error
    /// message (`Database index `idx` already contains ...`), so the index
    /// name is lifted out of it.
    pub fn from_check(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        match unique_index_name(&message) {
            Some(index) => DbError::UniqueViolation { index },
            None => DbError::Query(message),
        }
    }

    /// Name of the unique index that rejected the write, if any.
    pub fn unique_index(&self) -> Option<&str> {
        match self {
            DbError::UniqueViolation { index } => Some(index),
            _ => None,
        }
    }
}

fn unique_index_name(message: &str) -> Option<String> {
    if !message.contains("already contains") {
        return None;
    }
    let start = message.find("index `")? + "index `".len();
    let len = message[start..].find('`')?;
    Some(message[start..start + len].to_string())
}

impl From<DbError> for PorticoError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PorticoError::NotFound { entity, id },
            DbError::UniqueViolation { index } => PorticoError::AlreadyExists { entity: index },
            other => PorticoError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_index_name_from_violation_message() {
        let msg = "Database index `idx_tenant_slug` already contains 'acmeinc', \
                   with record `tenant:abc`";
        assert_eq!(unique_index_name(msg).as_deref(), Some("idx_tenant_slug"));
    }

    #[test]
    fn other_messages_are_not_violations() {
        assert_eq!(unique_index_name("Parse error near `SELECT`"), None);
    }

    #[test]
    fn unique_violation_maps_to_already_exists() {
        let err: PorticoError = DbError::UniqueViolation {
            index: "idx_user_tenant_email".into(),
        }
        .into();
        assert!(matches!(err, PorticoError::AlreadyExists { entity } if entity == "idx_user_tenant_email"));
    }
}
