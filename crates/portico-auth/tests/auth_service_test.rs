//! Integration tests for login and the Session Manager.

mod common;

use common::{Harness, harness};
use portico_auth::provisioning::ProvisionOutcome;
use portico_auth::service::LoginInput;
use portico_auth::signup::EnrollInput;
use portico_core::error::PorticoError;
use portico_core::models::tenant::Tenant;
use portico_core::repository::{SessionRepository, TenantRepository};
use portico_db::repository::{SurrealSessionRepository, SurrealTenantRepository};

const PASSWORD: &str = "correct horse";

async fn tenant_with_owner(h: &Harness, email: &str, org: &str) -> Tenant {
    let issued = h
        .signups
        .enroll(EnrollInput {
            email: email.into(),
            org_name: org.into(),
            password: PASSWORD.into(),
        })
        .await
        .unwrap();
    let ProvisionOutcome::Confirmed { tenant_id, .. } =
        h.provisioning.confirm(&issued.token, None).await
    else {
        panic!("signup did not confirm");
    };
    SurrealTenantRepository::new(h.db.clone())
        .get_by_id(tenant_id)
        .await
        .unwrap()
}

fn login(email: &str, password: &str) -> LoginInput {
    LoginInput {
        email: email.into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn login_opens_a_session_bound_to_the_tenant() {
    let h = harness().await;
    let acme = tenant_with_owner(&h, "ceo@acme.io", "Acme").await;

    let out = h
        .auth
        .login(&acme, login("CEO@acme.io", PASSWORD))
        .await
        .unwrap();
    assert!(out.session.token.len() >= 43);

    let active = h
        .auth
        .sessions()
        .validate(&out.session.token)
        .await
        .unwrap()
        .expect("session should validate");
    assert_eq!(active.user.id, out.user_id);
    assert_eq!(active.tenant_id(), acme.id);
}

#[tokio::test]
async fn raw_session_token_is_not_stored() {
    let h = harness().await;
    let acme = tenant_with_owner(&h, "ceo@acme.io", "Acme").await;
    let out = h
        .auth
        .login(&acme, login("ceo@acme.io", PASSWORD))
        .await
        .unwrap();

    let repo = SurrealSessionRepository::new(h.db.clone());
    assert!(repo.get_active(&out.session.token).await.is_err());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let h = harness().await;
    let acme = tenant_with_owner(&h, "ceo@acme.io", "Acme").await;

    let wrong = h
        .auth
        .login(&acme, login("ceo@acme.io", "nope nope"))
        .await
        .unwrap_err();
    let unknown = h
        .auth
        .login(&acme, login("ghost@acme.io", PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(wrong, PorticoError::AuthenticationFailed { .. }));
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn credentials_do_not_cross_tenants() {
    let h = harness().await;
    tenant_with_owner(&h, "ceo@acme.io", "Acme").await;
    let globex = tenant_with_owner(&h, "ceo@globex.io", "Globex").await;

    let err = h
        .auth
        .login(&globex, login("ceo@acme.io", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, PorticoError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn tenant_with_signins_disabled_refuses_login() {
    let h = harness().await;
    let mut acme = tenant_with_owner(&h, "ceo@acme.io", "Acme").await;
    acme.allow_signins = false;

    let err = h
        .auth
        .login(&acme, login("ceo@acme.io", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, PorticoError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn unknown_and_empty_session_tokens_are_anonymous() {
    let h = harness().await;
    let sessions = h.auth.sessions();

    assert!(sessions.validate("").await.unwrap().is_none());
    assert!(sessions.validate("not-a-session").await.unwrap().is_none());
}

#[tokio::test]
async fn revoked_session_no_longer_validates() {
    let h = harness().await;
    let acme = tenant_with_owner(&h, "ceo@acme.io", "Acme").await;
    let out = h
        .auth
        .login(&acme, login("ceo@acme.io", PASSWORD))
        .await
        .unwrap();
    let sessions = h.auth.sessions();

    sessions.revoke(&out.session.token).await.unwrap();
    assert!(sessions.validate(&out.session.token).await.unwrap().is_none());

    // Revoking twice, or revoking nothing, is not an error.
    sessions.revoke(&out.session.token).await.unwrap();
    sessions.revoke("").await.unwrap();
}
