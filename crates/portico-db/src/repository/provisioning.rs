//! SurrealDB implementation of [`ProvisioningStore`].
//!
//! The whole confirmation runs as one `BEGIN ... COMMIT` script. The
//! duplicate checks inside it `THROW`, which cancels every statement in
//! the transaction. Under a race the loser may instead hit a unique index
//! or a commit conflict. Either way nothing is written. A violated index
//! names the conflict directly; anything else is recovered afterwards by
//! inspecting the committed state.

use portico_core::error::PorticoError;
use portico_core::models::provisioning::{
    ProvisionConflict, ProvisionError, ProvisionPlan, ProvisionedAccount,
};
use portico_core::models::user::Role;
use portico_core::repository::ProvisioningStore;
use surrealdb::{Connection, Surreal};
use tracing::{debug, warn};
use uuid::Uuid;

use super::CountRow;
use crate::error::DbError;

const PROVISION_TENANT: &str = "\
BEGIN TRANSACTION;
LET $pending = (SELECT VALUE meta::id(id) FROM pending_signup \
    WHERE token = $signup_token AND expires_at > time::now());
IF array::len($pending) == 0 { THROW 'pending_consumed'; };
IF array::len((SELECT VALUE meta::id(id) FROM tenant WHERE email = $email)) > 0 \
    { THROW 'email_registered'; };
IF array::len((SELECT VALUE meta::id(id) FROM tenant WHERE slug = $slug)) > 0 \
    { THROW 'slug_taken'; };
DELETE pending_signup WHERE token = $signup_token;
CREATE type::record('tenant', $tenant_id) SET \
    slug = $slug, name = $name, email = $email, \
    is_active = true, is_deleted = false, allow_signins = true;
CREATE type::record('user', $user_id) SET \
    tenant_id = $tenant_id, email = $email, password_hash = $password_hash, \
    is_verified = true, role = $role;
CREATE type::record('membership', $membership_id) SET \
    user_id = $user_id, tenant_id = $tenant_id, role = $role, is_active = true;
COMMIT TRANSACTION;
";

const PROVISION_MEMBER: &str = "\
BEGIN TRANSACTION;
LET $pending = (SELECT VALUE meta::id(id) FROM pending_signup \
    WHERE token = $signup_token AND expires_at > time::now());
IF array::len($pending) == 0 { THROW 'pending_consumed'; };
IF array::len((SELECT VALUE meta::id(id) FROM user \
    WHERE tenant_id = $tenant_id AND email = $email)) > 0 \
    { THROW 'email_registered'; };
DELETE pending_signup WHERE token = $signup_token;
CREATE type::record('user', $user_id) SET \
    tenant_id = $tenant_id, email = $email, password_hash = $password_hash, \
    is_verified = true, role = $role;
CREATE type::record('membership', $membership_id) SET \
    user_id = $user_id, tenant_id = $tenant_id, role = $role, is_active = true;
COMMIT TRANSACTION;
";

/// Conflict named directly by a unique index that rejected the write.
fn conflict_for_index(err: &DbError) -> Option<ProvisionConflict> {
    match err.unique_index()? {
        "idx_tenant_slug" => Some(ProvisionConflict::SlugTaken),
        "idx_tenant_email" | "idx_user_tenant_email" | "idx_membership_user_tenant" => {
            Some(ProvisionConflict::EmailRegistered)
        }
        _ => None,
    }
}

/// SurrealDB implementation of the atomic provisioning transaction.
#[derive(Clone)]
pub struct SurrealProvisioningStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProvisioningStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn count(
        &self,
        query: &'static str,
        binds: Vec<(&'static str, String)>,
    ) -> Result<u64, DbError> {
        let mut builder = self.db.query(query);
        for bind in binds {
            builder = builder.bind(bind);
        }
        let mut result = builder.await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    /// Work out why a rolled-back transaction did not commit.
    async fn diagnose(&self, plan: &ProvisionPlan) -> Result<Option<ProvisionConflict>, DbError> {
        let pending = self
            .count(
                "SELECT count() AS total FROM pending_signup \
                 WHERE token = $signup_token AND expires_at > time::now() GROUP ALL",
                vec![("signup_token", plan.token().to_string())],
            )
            .await?;
        if pending == 0 {
            return Ok(Some(ProvisionConflict::PendingConsumed));
        }

        let conflict = match plan {
            ProvisionPlan::Tenant { tenant, .. } => {
                let email_used = self
                    .count(
                        "SELECT count() AS total FROM tenant WHERE email = $email GROUP ALL",
                        vec![("email", tenant.email.clone())],
                    )
                    .await?;
                let slug_used = self
                    .count(
                        "SELECT count() AS total FROM tenant WHERE slug = $slug GROUP ALL",
                        vec![("slug", tenant.slug.clone())],
                    )
                    .await?;
                if email_used > 0 {
                    Some(ProvisionConflict::EmailRegistered)
                } else if slug_used > 0 {
                    Some(ProvisionConflict::SlugTaken)
                } else {
                    None
                }
            }
            ProvisionPlan::Member {
                tenant_id, member, ..
            } => {
                let email_used = self
                    .count(
                        "SELECT count() AS total FROM user \
                         WHERE tenant_id = $tenant_id AND email = $email GROUP ALL",
                        vec![
                            ("tenant_id", tenant_id.to_string()),
                            ("email", member.email.clone()),
                        ],
                    )
                    .await?;
                (email_used > 0).then_some(ProvisionConflict::EmailRegistered)
            }
        };
        Ok(conflict)
    }
}

impl<C: Connection> ProvisioningStore for SurrealProvisioningStore<C> {
    async fn provision(&self, plan: ProvisionPlan) -> Result<ProvisionedAccount, ProvisionError> {
        let user_id = Uuid::new_v4();
        let membership_id = Uuid::new_v4();

        let (builder, tenant_id) = match &plan {
            ProvisionPlan::Tenant {
                token,
                tenant,
                owner,
            } => {
                let tenant_id = Uuid::new_v4();
                let builder = self
                    .db
                    .query(PROVISION_TENANT)
                    .bind(("signup_token", token.clone()))
                    .bind(("slug", tenant.slug.clone()))
                    .bind(("name", tenant.name.clone()))
                    .bind(("email", owner.email.clone()))
                    .bind(("password_hash", owner.password_hash.clone()))
                    .bind(("role", Role::Owner.as_str()));
                (builder, tenant_id)
            }
            ProvisionPlan::Member {
                token,
                tenant_id,
                member,
            } => {
                let builder = self
                    .db
                    .query(PROVISION_MEMBER)
                    .bind(("signup_token", token.clone()))
                    .bind(("email", member.email.clone()))
                    .bind(("password_hash", member.password_hash.clone()))
                    .bind(("role", Role::Member.as_str()));
                (builder, *tenant_id)
            }
        };

        let outcome = builder
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("membership_id", membership_id.to_string()))
            .await
            .map_err(DbError::from)
            .and_then(|response| response.check().map_err(DbError::from_check));

        match outcome {
            Ok(_) => Ok(ProvisionedAccount {
                tenant_id,
                user_id,
                membership_id,
            }),
            Err(err) => {
                debug!(error = %err, "provisioning transaction rolled back");
                if let Some(conflict) = conflict_for_index(&err) {
                    return Err(ProvisionError::Conflict(conflict));
                }
                match self.diagnose(&plan).await {
                    Ok(Some(conflict)) => Err(ProvisionError::Conflict(conflict)),
                    Ok(None) => {
                        warn!(error = %err, "provisioning failed without a business conflict");
                        Err(ProvisionError::Store(PorticoError::from(err)))
                    }
                    Err(diag_err) => {
                        warn!(error = %diag_err, "could not inspect state after failed provisioning");
                        Err(ProvisionError::Store(PorticoError::from(err)))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(index: &str) -> DbError {
        DbError::UniqueViolation {
            index: index.into(),
        }
    }

    #[test]
    fn unique_indexes_name_the_conflict() {
        assert_eq!(
            conflict_for_index(&violation("idx_tenant_slug")),
            Some(ProvisionConflict::SlugTaken)
        );
        assert_eq!(
            conflict_for_index(&violation("idx_user_tenant_email")),
            Some(ProvisionConflict::EmailRegistered)
        );
        assert_eq!(conflict_for_index(&violation("idx_pending_token")), None);
        assert_eq!(conflict_for_index(&DbError::Query("timeout".into())), None);
    }
}
