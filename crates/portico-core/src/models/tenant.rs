//! Tenant domain model.
//!
//! A tenant is an organization reachable at `<slug>.<root domain>`. Every
//! user, membership and session is scoped to exactly one tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An organization/customer account, identified by its subdomain slug.
///
/// Tenants are only ever created by provisioning and are soft-deleted
/// (`is_deleted`), never removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tenant {
    pub id: Uuid,
    /// Globally unique, lowercase subdomain label (e.g. `acmeinc`).
    pub slug: String,
    /// Human-readable organization name.
    pub name: String,
    /// Contact email of the owner who signed the organization up.
    pub email: String,
    pub is_active: bool,
    pub is_deleted: bool,
    /// When false, logins on this tenant are refused.
    pub allow_signins: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Whether the tenant may serve requests at all.
    pub fn is_live(&self) -> bool {
        self.is_active && !self.is_deleted
    }
}

/// Fields required to create a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub slug: String,
    pub name: String,
    pub email: String,
}
