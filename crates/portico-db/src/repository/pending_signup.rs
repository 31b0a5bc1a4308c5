//! SurrealDB implementation of [`PendingSignupRepository`].
//!
//! The two signup shapes share one table: `kind` says which of
//! `org_name` / `tenant_id` is populated.

use chrono::{DateTime, Utc};
use portico_core::error::PorticoResult;
use portico_core::models::pending_signup::{CreatePendingSignup, PendingSignup, SignupKind};
use portico_core::repository::PendingSignupRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PendingSignupRow {
    email: String,
    kind: String,
    org_name: Option<String>,
    tenant_id: Option<String>,
    password_hash: String,
    token: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl PendingSignupRow {
    fn into_pending(self, id: Uuid) -> Result<PendingSignup, DbError> {
        let kind = match (self.kind.as_str(), self.org_name, self.tenant_id) {
            ("tenant", Some(org_name), _) => SignupKind::Tenant { org_name },
            ("user", _, Some(tenant_id)) => SignupKind::User {
                tenant_id: parse_uuid(&tenant_id, "tenant id")?,
            },
            (other, _, _) => {
                return Err(DbError::Corrupt(format!(
                    "pending signup {id} has inconsistent kind {other}"
                )));
            }
        };
        Ok(PendingSignup {
            id,
            email: self.email,
            kind,
            password_hash: self.password_hash,
            token: self.token,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct PendingSignupRowWithId {
    record_id: String,
    email: String,
    kind: String,
    org_name: Option<String>,
    tenant_id: Option<String>,
    password_hash: String,
    token: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl PendingSignupRowWithId {
    fn try_into_pending(self) -> Result<PendingSignup, DbError> {
        let id = parse_uuid(&self.record_id, "pending signup id")?;
        PendingSignupRow {
            email: self.email,
            kind: self.kind,
            org_name: self.org_name,
            tenant_id: self.tenant_id,
            password_hash: self.password_hash,
            token: self.token,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
        .into_pending(id)
    }
}

/// SurrealDB implementation of the PendingSignup repository.
#[derive(Clone)]
pub struct SurrealPendingSignupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPendingSignupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PendingSignupRepository for SurrealPendingSignupRepository<C> {
    async fn create(&self, input: CreatePendingSignup) -> PorticoResult<PendingSignup> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let kind = input.kind.as_str();
        let (org_name, tenant_id) = match input.kind {
            SignupKind::Tenant { org_name } => (Some(org_name), None),
            SignupKind::User { tenant_id } => (None, Some(tenant_id.to_string())),
        };

        let result = self
            .db
            .query(
                "CREATE type::record('pending_signup', $id) SET \
                 email = $email, \
                 kind = $kind, \
                 org_name = $org_name, \
                 tenant_id = $tenant_id, \
                 password_hash = $password_hash, \
                 token = $signup_token, \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email))
            .bind(("kind", kind))
            .bind(("org_name", org_name))
            .bind(("tenant_id", tenant_id))
            .bind(("password_hash", input.password_hash))
            .bind(("signup_token", input.token))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_check)?;

        let rows: Vec<PendingSignupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "pending_signup".into(),
            id: id_str,
        })?;

        Ok(row.into_pending(id)?)
    }

    async fn get_by_token(&self, token: &str) -> PorticoResult<PendingSignup> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM pending_signup \
                 WHERE token = $signup_token AND expires_at > time::now()",
            )
            .bind(("signup_token", token.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PendingSignupRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "pending_signup".into(),
            id: "token".into(),
        })?;

        Ok(row.try_into_pending()?)
    }

    async fn exists_for_user(&self, tenant_id: Uuid, email: &str) -> PorticoResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM pending_signup \
                 WHERE kind = 'user' AND tenant_id = $tenant_id \
                 AND email = $email AND expires_at > time::now() GROUP ALL",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn delete_by_token(&self, token: &str) -> PorticoResult<bool> {
        let result = self
            .db
            .query("DELETE pending_signup WHERE token = $signup_token RETURN BEFORE")
            .bind(("signup_token", token.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_check)?;
        let rows: Vec<PendingSignupRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn purge_expired(&self) -> PorticoResult<u64> {
        let result = self
            .db
            .query("DELETE pending_signup WHERE expires_at <= time::now() RETURN BEFORE")
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_check)?;
        let rows: Vec<PendingSignupRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.len() as u64)
    }
}
