//! SurrealDB implementation of [`MembershipRepository`].

use chrono::{DateTime, Utc};
use portico_core::error::PorticoResult;
use portico_core::models::membership::Membership;
use portico_core::models::user::Role;
use portico_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MembershipRowWithId {
    record_id: String,
    user_id: String,
    tenant_id: String,
    role: String,
    is_active: bool,
    joined_at: DateTime<Utc>,
}

impl MembershipRowWithId {
    fn try_into_membership(self) -> Result<Membership, DbError> {
        Ok(Membership {
            id: parse_uuid(&self.record_id, "membership id")?,
            user_id: parse_uuid(&self.user_id, "user id")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant id")?,
            role: self.role.parse::<Role>().map_err(DbError::Corrupt)?,
            is_active: self.is_active,
            joined_at: self.joined_at,
        })
    }
}

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn get(&self, tenant_id: Uuid, user_id: Uuid) -> PorticoResult<Membership> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM membership \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "membership".into(),
            id: format!("tenant={tenant_id},user={user_id}"),
        })?;

        Ok(row.try_into_membership()?)
    }
}
