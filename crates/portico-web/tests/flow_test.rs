//! End-to-end flows over HTTP: signup issuance, link confirmation, login,
//! dashboard, and route scoping.

mod common;

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{StatusCode, header};
use common::*;
use portico_auth::{EnrollInput, RegisterInput};
use tower::ServiceExt;

#[tokio::test]
async fn enroll_over_http_never_returns_the_link() {
    let app = test_app().await;

    let request = post_form(
        ROOT,
        "/enroll",
        &[
            ("email", "Founder@Acme.io"),
            ("org_name", "Acme Inc"),
            ("password", PASSWORD),
        ],
    );
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let view = body_json(response).await;
    assert_eq!(view["view"], "enroll_sent");
    assert_eq!(view["data"]["email"], "founder@acme.io");
    let rendered = view.to_string();
    assert!(!rendered.contains("token="));
    assert!(!rendered.contains("/verify"));
}

#[tokio::test]
async fn enroll_validation_errors_rerender_the_form() {
    let app = test_app().await;

    let request = post_form(
        ROOT,
        "/enroll",
        &[("email", "not-an-email"), ("org_name", "Acme"), ("password", PASSWORD)],
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["view"], "enroll");

    let request = post_form(
        ROOT,
        "/enroll",
        &[("email", "a@acme.io"), ("org_name", "Acme"), ("password", "short")],
    );
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn enroll_for_existing_tenant_is_conflict() {
    let app = test_app().await;
    tenant_with_owner(&app.state, "Acme", "ceo@acme.io").await;

    let request = post_form(
        ROOT,
        "/enroll",
        &[("email", "other@acme.io"), ("org_name", "acme"), ("password", PASSWORD)],
    );
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["data"]["error"], "already_registered");
}

#[tokio::test]
async fn organization_signup_verify_login_dashboard() {
    let app = test_app().await;

    let issued = app
        .state
        .signups
        .enroll(EnrollInput {
            email: "ceo@acme.io".into(),
            org_name: "Acme Inc".into(),
            password: PASSWORD.into(),
        })
        .await
        .unwrap();
    assert!(issued.link.starts_with("https://portico.test/verify?token="));

    let uri = format!("/verify?token={}", issued.token);
    let response = app.router.clone().oneshot(get(ROOT, &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    assert_eq!(view["view"], "verify");
    assert_eq!(view["data"]["outcome"], "confirmed");

    // Replay.
    let response = app.router.clone().oneshot(get(ROOT, &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["data"]["outcome"], "not_found");

    // Log in on the new subdomain.
    let request = post_form(
        &host("acmeinc"),
        "/login",
        &[("email", "CEO@acme.io"), ("password", PASSWORD)],
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/dashboard");
    let session_cookie = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with("portico_session="))
        .expect("session cookie");
    assert!(session_cookie.contains("HttpOnly"));
    assert!(session_cookie.contains("Max-Age=86400"));
    let session = cookie_value(&response, "portico_session").unwrap();

    let cookie = format!("portico_session={session}");
    let response = app
        .router
        .oneshot(get_with_cookie(&host("acmeinc"), "/dashboard", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    assert_eq!(view["view"], "dashboard");
    assert_eq!(view["data"]["role"], "owner");
    assert_eq!(view["data"]["tenant"]["slug"], "acmeinc");
}

#[tokio::test]
async fn invalid_tokens_map_to_bad_request() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(get(ROOT, "/verify?token=garbage"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["data"]["outcome"], "invalid_token");

    let response = app.router.oneshot(get(ROOT, "/verify")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn member_signup_confirms_only_on_its_tenant() {
    let app = test_app().await;
    let acme = tenant_with_owner(&app.state, "Acme", "ceo@acme.io").await;
    tenant_with_owner(&app.state, "Globex", "ceo@globex.io").await;

    // Register over HTTP succeeds without echoing the link.
    let request = post_form(
        &host("acme"),
        "/register",
        &[("email", "dev@acme.io"), ("password", PASSWORD)],
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["view"], "register_sent");

    let issued = app
        .state
        .signups
        .register(
            &acme,
            RegisterInput {
                email: "ops@acme.io".into(),
                password: PASSWORD.into(),
            },
        )
        .await
        .unwrap();
    assert!(issued.link.starts_with("https://acme.portico.test/confirm?token="));
    let uri = format!("/confirm?token={}", issued.token);

    let response = app.router.clone().oneshot(get(&host("globex"), &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["data"]["outcome"], "invalid_token");

    let response = app.router.clone().oneshot(get(&host("acme"), &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["outcome"], "confirmed");

    // The new member can log in and sees the member role.
    let session = session_for(&app.state, &acme, "ops@acme.io").await;
    let cookie = format!("portico_session={session}");
    let response = app
        .router
        .oneshot(get_with_cookie(&host("acme"), "/dashboard", &cookie))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["data"]["role"], "member");
}

#[tokio::test]
async fn register_for_existing_member_is_conflict() {
    let app = test_app().await;
    tenant_with_owner(&app.state, "Acme", "ceo@acme.io").await;

    let request = post_form(
        &host("acme"),
        "/register",
        &[("email", "ceo@acme.io"), ("password", PASSWORD)],
    );
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn wrong_password_rerenders_login_with_401() {
    let app = test_app().await;
    tenant_with_owner(&app.state, "Acme", "ceo@acme.io").await;

    let request = post_form(
        &host("acme"),
        "/login",
        &[("email", "ceo@acme.io"), ("password", "wrong password")],
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(cookie_value(&response, "portico_session").is_none());
    let wrong_password = body_json(response).await;

    let request = post_form(
        &host("acme"),
        "/login",
        &[("email", "nobody@acme.io"), ("password", PASSWORD)],
    );
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let unknown_email = body_json(response).await;

    assert_eq!(wrong_password["data"], unknown_email["data"]);
    assert_eq!(wrong_password["data"]["error"], "invalid_credentials");
}

#[tokio::test]
async fn dashboard_requires_a_session() {
    let app = test_app().await;
    tenant_with_owner(&app.state, "Acme", "ceo@acme.io").await;

    let response = app.router.oneshot(get(&host("acme"), "/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login?error=auth");
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = test_app().await;
    let acme = tenant_with_owner(&app.state, "Acme", "ceo@acme.io").await;
    let session = session_for(&app.state, &acme, "ceo@acme.io").await;

    let cookie = format!("portico_session={session}");

    let request = post_form_with_cookie(&host("acme"), "/logout", &[], Some(&cookie));
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(cookie_value(&response, "portico_session").as_deref(), Some(""));

    // The token is revoked server-side, not just forgotten by the client.
    let response = app
        .router
        .oneshot(get_with_cookie(&host("acme"), "/dashboard", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login?error=auth");
}

#[tokio::test]
async fn routes_are_scoped_to_root_or_tenant() {
    let app = test_app().await;
    tenant_with_owner(&app.state, "Acme", "ceo@acme.io").await;

    for (h, path) in [
        (host("acme"), "/enroll"),
        (ROOT.to_string(), "/register"),
        (ROOT.to_string(), "/login"),
    ] {
        let response = app.router.clone().oneshot(get(&h, path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{h}{path}");
    }

    for (h, path, view) in [
        (ROOT.to_string(), "/enroll", "enroll"),
        (host("acme"), "/register", "register"),
        (host("acme"), "/login", "login"),
    ] {
        let response = app.router.clone().oneshot(get(&h, path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{h}{path}");
        assert_eq!(body_json(response).await["view"], view);
    }
}

#[tokio::test]
async fn form_posts_are_rate_limited_per_address() {
    let app = test_app_with(portico_web::WebConfig {
        rate_limit_max: 2,
        ..web_config()
    })
    .await;
    tenant_with_owner(&app.state, "Acme", "ceo@acme.io").await;

    let attempt = |addr: [u8; 4]| {
        let mut request = post_form(
            &host("acme"),
            "/login",
            &[("email", "ceo@acme.io"), ("password", "wrong password")],
        );
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((addr, 40000))));
        request
    };

    for _ in 0..2 {
        let response = app.router.clone().oneshot(attempt([198, 51, 100, 1])).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = app.router.clone().oneshot(attempt([198, 51, 100, 1])).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Other clients and plain page views are unaffected.
    let response = app.router.clone().oneshot(attempt([198, 51, 100, 2])).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = app.router.oneshot(get(&host("acme"), "/login")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
