//! SurrealDB implementation of [`SessionRepository`].
//!
//! The record key is the SHA-256 digest of the session token, so a
//! lookup is a direct record fetch and the raw token never reaches the
//! store.

use chrono::{DateTime, Utc};
use portico_core::error::PorticoResult;
use portico_core::models::session::{CreateSession, Session};
use portico_core::repository::SessionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SessionRow {
    tenant_id: String,
    user_id: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self, token_hash: String) -> Result<Session, DbError> {
        Ok(Session {
            token_hash,
            tenant_id: parse_uuid(&self.tenant_id, "tenant id")?,
            user_id: parse_uuid(&self.user_id, "user id")?,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> PorticoResult<Session> {
        let result = self
            .db
            .query(
                "CREATE type::record('session', $token_hash) SET \
                 tenant_id = $tenant_id, \
                 user_id = $user_id, \
                 expires_at = $expires_at",
            )
            .bind(("token_hash", input.token_hash.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_check)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: "new".into(),
        })?;

        Ok(row.into_session(input.token_hash)?)
    }

    async fn get_active(&self, token_hash: &str) -> PorticoResult<Session> {
        let token_hash = token_hash.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('session', $token_hash) \
                 WHERE expires_at > time::now()",
            )
            .bind(("token_hash", token_hash.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: "token".into(),
        })?;

        Ok(row.into_session(token_hash)?)
    }

    async fn delete(&self, token_hash: &str) -> PorticoResult<()> {
        self.db
            .query("DELETE type::record('session', $token_hash)")
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;
        Ok(())
    }

    async fn purge_expired(&self) -> PorticoResult<u64> {
        // Count expired sessions first, then delete.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM session \
                 WHERE expires_at <= time::now() GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE session WHERE expires_at <= time::now()")
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        Ok(total)
    }
}
