//! SurrealDB implementation of [`TenantRepository`].

use chrono::{DateTime, Utc};
use portico_core::error::PorticoResult;
use portico_core::models::tenant::Tenant;
use portico_core::repository::TenantRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct TenantRow {
    slug: String,
    name: String,
    email: String,
    is_active: bool,
    is_deleted: bool,
    allow_signins: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Tenant {
        Tenant {
            id,
            slug: self.slug,
            name: self.name,
            email: self.email,
            is_active: self.is_active,
            is_deleted: self.is_deleted,
            allow_signins: self.allow_signins,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TenantRowWithId {
    record_id: String,
    slug: String,
    name: String,
    email: String,
    is_active: bool,
    is_deleted: bool,
    allow_signins: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TenantRowWithId {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        let id = parse_uuid(&self.record_id, "tenant id")?;
        Ok(TenantRow {
            slug: self.slug,
            name: self.name,
            email: self.email,
            is_active: self.is_active,
            is_deleted: self.is_deleted,
            allow_signins: self.allow_signins,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
        .into_tenant(id))
    }
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn update_flags(&self, id: Uuid, sets: &str, active: Option<bool>) -> PorticoResult<()> {
        let id_str = id.to_string();
        let query = format!(
            "UPDATE type::record('tenant', $id) SET {sets}, updated_at = time::now()"
        );

        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(active) = active {
            builder = builder.bind(("active", active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(DbError::from_check)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "tenant".into(),
                id: id_str,
            }
            .into());
        }
        Ok(())
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn get_by_id(&self, id: Uuid) -> PorticoResult<Tenant> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('tenant', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: id_str,
        })?;

        Ok(row.into_tenant(id))
    }

    async fn get_active_by_slug(&self, slug: &str) -> PorticoResult<Tenant> {
        let slug_owned = slug.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tenant \
                 WHERE slug = $slug AND is_active = true AND is_deleted = false \
                 LIMIT 1",
            )
            .bind(("slug", slug_owned))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: format!("slug={slug}"),
        })?;

        Ok(row.try_into_tenant()?)
    }

    async fn slug_or_email_taken(&self, slug: &str, email: &str) -> PorticoResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM tenant \
                 WHERE slug = $slug OR email = $email GROUP ALL",
            )
            .bind(("slug", slug.to_string()))
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> PorticoResult<()> {
        self.update_flags(id, "is_active = $active", Some(active))
            .await
    }

    async fn soft_delete(&self, id: Uuid) -> PorticoResult<()> {
        self.update_flags(id, "is_deleted = true, deleted_at = time::now()", None)
            .await
    }
}
