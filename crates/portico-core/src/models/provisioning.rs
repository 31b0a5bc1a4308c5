//! Inputs and results of the atomic provisioning transaction.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::tenant::CreateTenant;
use super::user::NewAccount;
use crate::error::PorticoError;

/// Everything the store must write, atomically, to turn a pending
/// signup into an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProvisionPlan {
    /// Create the tenant, its owner user and the owner membership.
    Tenant {
        token: String,
        tenant: CreateTenant,
        owner: NewAccount,
    },
    /// Create a member user and membership inside an existing tenant.
    Member {
        token: String,
        tenant_id: Uuid,
        member: NewAccount,
    },
}

impl ProvisionPlan {
    /// The pending-signup token this plan consumes.
    pub fn token(&self) -> &str {
        match self {
            ProvisionPlan::Tenant { token, .. } | ProvisionPlan::Member { token, .. } => token,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            ProvisionPlan::Tenant { owner, .. } => &owner.email,
            ProvisionPlan::Member { member, .. } => &member.email,
        }
    }
}

/// Rows written by a committed provisioning transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedAccount {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub membership_id: Uuid,
}

/// Business reasons a provisioning transaction did not commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionConflict {
    /// The pending row is gone: never existed, expired, or already used.
    PendingConsumed,
    /// The email is already registered where the account would live.
    EmailRegistered,
    /// Another tenant already owns the slug.
    SlugTaken,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("provisioning conflict: {0:?}")]
    Conflict(ProvisionConflict),

    #[error(transparent)]
    Store(#[from] PorticoError),
}
