//! SurrealDB repository implementations.

mod membership;
mod pending_signup;
mod provisioning;
mod session;
mod tenant;
mod user;

pub use membership::SurrealMembershipRepository;
pub use pending_signup::SurrealPendingSignupRepository;
pub use provisioning::SurrealProvisioningStore;
pub use session::SurrealSessionRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Corrupt(format!("invalid {what}: {e}")))
}
