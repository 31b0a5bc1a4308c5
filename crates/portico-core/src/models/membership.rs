//! Membership domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

/// The role-bearing link between a user and a tenant. Unique per
/// (user, tenant); created in the same transaction as the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}
