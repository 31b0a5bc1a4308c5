//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and may block on store I/O.
//! Tenants, users and memberships have no `create` here: the only way
//! to create them is the atomic [`ProvisioningStore::provision`].

use uuid::Uuid;

use crate::error::PorticoResult;
use crate::models::{
    membership::Membership,
    pending_signup::{CreatePendingSignup, PendingSignup},
    provisioning::{ProvisionError, ProvisionPlan, ProvisionedAccount},
    session::{CreateSession, Session},
    tenant::Tenant,
    user::User,
};

// ---------------------------------------------------------------------------
// Tenants (global scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PorticoResult<Tenant>> + Send;
    /// Look up a live tenant by slug. Deactivated and soft-deleted
    /// tenants yield `NotFound`, exactly like unknown slugs.
    fn get_active_by_slug(&self, slug: &str) -> impl Future<Output = PorticoResult<Tenant>> + Send;
    /// Whether any tenant (live or not) already uses this slug or
    /// contact email.
    fn slug_or_email_taken(
        &self,
        slug: &str,
        email: &str,
    ) -> impl Future<Output = PorticoResult<bool>> + Send;
    fn set_active(&self, id: Uuid, active: bool) -> impl Future<Output = PorticoResult<()>> + Send;
    /// Soft-delete: sets `is_deleted` and `deleted_at`.
    fn soft_delete(&self, id: Uuid) -> impl Future<Output = PorticoResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = PorticoResult<User>> + Send;
    /// Look up a verified user by email within a tenant.
    fn get_verified_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = PorticoResult<User>> + Send;
    fn email_registered(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = PorticoResult<bool>> + Send;
}

pub trait MembershipRepository: Send + Sync {
    fn get(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = PorticoResult<Membership>> + Send;
}

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = PorticoResult<Session>> + Send;
    /// Fetch an unexpired session by token digest. Expired and unknown
    /// sessions both yield `NotFound`.
    fn get_active(&self, token_hash: &str) -> impl Future<Output = PorticoResult<Session>> + Send;
    /// Remove one session. Unknown digests are not an error.
    fn delete(&self, token_hash: &str) -> impl Future<Output = PorticoResult<()>> + Send;
    /// Remove all expired sessions.
    fn purge_expired(&self) -> impl Future<Output = PorticoResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Signup & provisioning
// ---------------------------------------------------------------------------

pub trait PendingSignupRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePendingSignup,
    ) -> impl Future<Output = PorticoResult<PendingSignup>> + Send;
    /// Fetch an unexpired pending signup by its exact token.
    fn get_by_token(&self, token: &str)
    -> impl Future<Output = PorticoResult<PendingSignup>> + Send;
    /// Whether a user-signup for (tenant, email) is already waiting.
    fn exists_for_user(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = PorticoResult<bool>> + Send;
    /// Delete the row carrying `token`. Returns whether a row was removed.
    fn delete_by_token(&self, token: &str) -> impl Future<Output = PorticoResult<bool>> + Send;
    /// Remove all expired pending signups. Nothing in Portico schedules
    /// this; it is exposed for an external sweeper.
    fn purge_expired(&self) -> impl Future<Output = PorticoResult<u64>> + Send;
}

pub trait ProvisioningStore: Send + Sync {
    /// In one store transaction: consume the pending row for the plan's
    /// token, re-check for duplicates, and insert tenant/user/membership.
    ///
    /// Either every row is written and the pending row is gone, or
    /// nothing changed. Duplicates (including ones that only surface as
    /// unique-index violations under a race) come back as
    /// [`ProvisionError::Conflict`].
    fn provision(
        &self,
        plan: ProvisionPlan,
    ) -> impl Future<Output = Result<ProvisionedAccount, ProvisionError>> + Send;
}
