//! Route table.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use portico_auth::TenantDirectory;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::pipeline::{Pipeline, security_pipeline};
use crate::rate_limit::rate_limit;
use crate::state::AppState;

/// The application router with the subdomain tenant directory.
pub fn router(state: Arc<AppState>) -> Router {
    let directory = state.directory();
    router_with_directory(state, directory)
}

/// The application router with a caller-supplied tenant directory.
pub fn router_with_directory<D>(state: Arc<AppState>, directory: D) -> Router
where
    D: TenantDirectory + 'static,
{
    let limited = middleware::from_fn_with_state(state.clone(), rate_limit);
    let pipeline = Arc::new(Pipeline::new(directory, state.clone()));

    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/enroll",
            get(handlers::enroll_form).merge(post(handlers::enroll).layer(limited.clone())),
        )
        .route(
            "/register",
            get(handlers::register_form).merge(post(handlers::register).layer(limited.clone())),
        )
        .route("/verify", get(handlers::verify))
        .route("/confirm", get(handlers::confirm))
        .route(
            "/login",
            get(handlers::login_form).merge(post(handlers::login).layer(limited)),
        )
        .route("/logout", post(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .layer(middleware::from_fn_with_state(
            pipeline,
            security_pipeline::<D>,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
