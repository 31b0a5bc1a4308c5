//! Shared fixtures for portico-auth integration tests.

#![allow(dead_code)]

use portico_auth::config::AuthConfig;
use portico_auth::provisioning::ProvisioningService;
use portico_auth::service::AuthService;
use portico_auth::session::SessionManager;
use portico_auth::signup::{LinkBase, SignupService};
use portico_auth::token::TokenCodec;
use portico_db::repository::{
    SurrealPendingSignupRepository, SurrealProvisioningStore, SurrealSessionRepository,
    SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

pub const ROOT: &str = "portico.test";

pub type Signups = SignupService<
    SurrealTenantRepository<Db>,
    SurrealUserRepository<Db>,
    SurrealPendingSignupRepository<Db>,
>;
pub type Provisioning =
    ProvisioningService<SurrealPendingSignupRepository<Db>, SurrealProvisioningStore<Db>>;
pub type Auth = AuthService<SurrealUserRepository<Db>, SurrealSessionRepository<Db>>;

pub struct Harness {
    pub db: Surreal<Db>,
    pub config: AuthConfig,
    pub codec: TokenCodec,
    pub signups: Signups,
    pub provisioning: Provisioning,
    pub auth: Auth,
}

pub fn test_config() -> AuthConfig {
    AuthConfig {
        signing_key: b"test-signing-key-test-signing-key".to_vec(),
        ..Default::default()
    }
}

pub async fn harness() -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    portico_db::run_migrations(&db).await.unwrap();

    let config = test_config();
    let codec = TokenCodec::from_config(&config);

    let signups = SignupService::new(
        SurrealTenantRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        SurrealPendingSignupRepository::new(db.clone()),
        codec.clone(),
        LinkBase {
            scheme: "https".into(),
            root_domain: ROOT.into(),
        },
        config.clone(),
    );
    let provisioning = ProvisioningService::new(
        codec.clone(),
        SurrealPendingSignupRepository::new(db.clone()),
        SurrealProvisioningStore::new(db.clone()),
    );
    let sessions = SessionManager::new(
        SurrealSessionRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        config.session_lifetime_secs,
    );
    let auth = AuthService::new(SurrealUserRepository::new(db.clone()), sessions, config.clone());

    Harness {
        db,
        config,
        codec,
        signups,
        provisioning,
        auth,
    }
}
