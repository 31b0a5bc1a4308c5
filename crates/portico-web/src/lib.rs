//! Portico Web: axum integration for the request security pipeline,
//! rate limiting, handlers and the router.

pub mod config;
pub mod context;
pub mod cookies;
pub mod error;
pub mod handlers;
pub mod lang;
pub mod pipeline;
pub mod rate_limit;
pub mod router;
pub mod state;

pub use config::{SameSite, WebConfig};
pub use context::SecurityContext;
pub use error::{WebError, WebResult};
pub use router::{router, router_with_directory};
pub use state::AppState;
