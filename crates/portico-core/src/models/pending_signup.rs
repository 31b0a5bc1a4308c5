//! Pending signup domain model.
//!
//! A pending signup is an account-creation intent waiting for its emailed
//! link to be followed. It is consumed exactly once by provisioning, or
//! left to expire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a pending signup will materialize into when confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignupKind {
    /// A new organization, submitted on the root domain. The signer
    /// becomes its owner.
    Tenant { org_name: String },
    /// A new member of an existing tenant, submitted on that tenant's
    /// subdomain.
    User { tenant_id: Uuid },
}

impl SignupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignupKind::Tenant { .. } => "tenant",
            SignupKind::User { .. } => "user",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSignup {
    pub id: Uuid,
    pub email: String,
    pub kind: SignupKind,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// The signed token mailed to the user; unique across pending rows.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePendingSignup {
    pub email: String,
    pub kind: SignupKind,
    pub password_hash: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
