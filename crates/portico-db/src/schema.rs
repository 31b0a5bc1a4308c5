//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings; roles and signup kinds as strings with ASSERT constraints.
//! The unique indexes on tenant slug, tenant email and
//! (tenant_id, email) for users are what make provisioning race-safe.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD slug ON TABLE tenant TYPE string;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD email ON TABLE tenant TYPE string;
DEFINE FIELD is_active ON TABLE tenant TYPE bool DEFAULT true;
DEFINE FIELD is_deleted ON TABLE tenant TYPE bool DEFAULT false;
DEFINE FIELD allow_signins ON TABLE tenant TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE tenant TYPE option<datetime>;
DEFINE INDEX idx_tenant_slug ON TABLE tenant COLUMNS slug UNIQUE;
DEFINE INDEX idx_tenant_email ON TABLE tenant COLUMNS email UNIQUE;

-- =======================================================================
-- Users (tenant scope; email unique within a tenant only)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD is_verified ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['owner', 'admin', 'member'];
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_tenant_email ON TABLE user \
    COLUMNS tenant_id, email UNIQUE;

-- =======================================================================
-- Memberships (tenant scope)
-- =======================================================================
DEFINE TABLE membership SCHEMAFULL;
DEFINE FIELD user_id ON TABLE membership TYPE string;
DEFINE FIELD tenant_id ON TABLE membership TYPE string;
DEFINE FIELD role ON TABLE membership TYPE string \
    ASSERT $value IN ['owner', 'admin', 'member'];
DEFINE FIELD is_active ON TABLE membership TYPE bool DEFAULT true;
DEFINE FIELD joined_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_membership_user_tenant ON TABLE membership \
    COLUMNS user_id, tenant_id UNIQUE;

-- =======================================================================
-- Sessions (record key is the token digest)
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE session TYPE string;
DEFINE FIELD user_id ON TABLE session TYPE string;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_expiry ON TABLE session COLUMNS expires_at;

-- =======================================================================
-- Pending signups
-- =======================================================================
DEFINE TABLE pending_signup SCHEMAFULL;
DEFINE FIELD email ON TABLE pending_signup TYPE string;
DEFINE FIELD kind ON TABLE pending_signup TYPE string \
    ASSERT $value IN ['tenant', 'user'];
DEFINE FIELD org_name ON TABLE pending_signup TYPE option<string>;
DEFINE FIELD tenant_id ON TABLE pending_signup TYPE option<string>;
DEFINE FIELD password_hash ON TABLE pending_signup TYPE string;
DEFINE FIELD token ON TABLE pending_signup TYPE string;
DEFINE FIELD expires_at ON TABLE pending_signup TYPE datetime;
DEFINE FIELD created_at ON TABLE pending_signup TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_pending_token ON TABLE pending_signup \
    COLUMNS token UNIQUE;
DEFINE INDEX idx_pending_tenant_email ON TABLE pending_signup \
    COLUMNS tenant_id, email;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}
