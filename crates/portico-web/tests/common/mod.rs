//! Shared fixtures for portico-web HTTP tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use portico_auth::csrf::generate_csrf_token;
use portico_auth::{AuthConfig, EnrollInput, LoginInput, ProvisionOutcome};
use portico_core::models::tenant::Tenant;
use portico_core::repository::TenantRepository;
use portico_db::{DbConfig, DbManager};
use portico_web::{AppState, WebConfig, router};
use serde_json::Value;

pub const ROOT: &str = "portico.test";
pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
}

pub fn web_config() -> WebConfig {
    WebConfig {
        root_domain: ROOT.into(),
        cookie_secure: false,
        ..Default::default()
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        signing_key: b"web-test-signing-key-web-test-signing".to_vec(),
        ..Default::default()
    }
}

pub async fn state_with(config: WebConfig) -> Arc<AppState> {
    let manager = DbManager::connect(&DbConfig::default()).await.unwrap();
    portico_db::run_migrations(manager.client()).await.unwrap();
    Arc::new(AppState::new(manager.client().clone(), auth_config(), config))
}

pub async fn test_app_with(config: WebConfig) -> TestApp {
    let state = state_with(config).await;
    TestApp {
        router: router(state.clone()),
        state,
    }
}

pub async fn test_app() -> TestApp {
    test_app_with(web_config()).await
}

/// Create a live tenant with an owner through enroll + verify.
pub async fn tenant_with_owner(state: &AppState, org: &str, email: &str) -> Tenant {
    let issued = state
        .signups
        .enroll(EnrollInput {
            email: email.into(),
            org_name: org.into(),
            password: PASSWORD.into(),
        })
        .await
        .unwrap();
    let ProvisionOutcome::Confirmed { tenant_id, .. } =
        state.provisioning.confirm(&issued.token, None).await
    else {
        panic!("signup did not confirm");
    };
    state.tenants.get_by_id(tenant_id).await.unwrap()
}

/// A raw session token for `email` on `tenant`.
pub async fn session_for(state: &AppState, tenant: &Tenant, email: &str) -> String {
    state
        .auth
        .login(
            tenant,
            LoginInput {
                email: email.into(),
                password: PASSWORD.into(),
            },
        )
        .await
        .unwrap()
        .session
        .token
}

pub fn host(slug: &str) -> String {
    format!("{slug}.{ROOT}")
}

pub fn get(host: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, host)
        .body(Body::empty())
        .unwrap()
}

pub fn get_with_cookie(host: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, host)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// A urlencoded POST carrying a matching CSRF cookie and form field.
pub fn post_form(host: &str, uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    post_form_with_cookie(host, uri, fields, None)
}

pub fn post_form_with_cookie(
    host: &str,
    uri: &str,
    fields: &[(&str, &str)],
    extra_cookie: Option<&str>,
) -> Request<Body> {
    let csrf = generate_csrf_token();
    let mut body = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in fields {
        body.append_pair(k, v);
    }
    body.append_pair("csrf_token", &csrf);

    let mut cookie = format!("csrf_token={csrf}");
    if let Some(extra) = extra_cookie {
        cookie.push_str("; ");
        cookie.push_str(extra);
    }

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::HOST, host)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, cookie)
        .body(Body::from(body.finish()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of cookie `name` from the response's `Set-Cookie` headers.
pub fn cookie_value<B>(response: &Response<B>, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|c| {
        let rest = c.strip_prefix(name)?.strip_prefix('=')?;
        Some(rest.split(';').next().unwrap_or_default().to_string())
    })
}
