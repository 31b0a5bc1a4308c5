//! SurrealDB implementation of [`UserRepository`].
//!
//! Users are only ever written by the provisioning transaction, so this
//! repository is read-only. Password hashing lives in `portico-auth`.

use chrono::{DateTime, Utc};
use portico_core::error::PorticoResult;
use portico_core::models::user::{Role, User};
use portico_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    tenant_id: String,
    email: String,
    password_hash: String,
    is_verified: bool,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        let tenant_id = parse_uuid(&self.tenant_id, "tenant id")?;
        let role = self.role.parse::<Role>().map_err(DbError::Corrupt)?;
        Ok(User {
            id,
            tenant_id,
            email: self.email,
            password_hash: self.password_hash,
            is_verified: self.is_verified,
            role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    tenant_id: String,
    email: String,
    password_hash: String,
    is_verified: bool,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = parse_uuid(&self.record_id, "user id")?;
        UserRow {
            tenant_id: self.tenant_id,
            email: self.email,
            password_hash: self.password_hash,
            is_verified: self.is_verified,
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_user(id)
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> PorticoResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('user', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn get_verified_by_email(&self, tenant_id: Uuid, email: &str) -> PorticoResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE tenant_id = $tenant_id AND email = $email \
                 AND is_verified = true",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("tenant={tenant_id},email={email}"),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn email_registered(&self, tenant_id: Uuid, email: &str) -> PorticoResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE tenant_id = $tenant_id AND email = $email GROUP ALL",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}
