//! Portico Core: domain models, repository traits and the shared error
//! type for the multi-tenant authentication core.

pub mod error;
pub mod models;
pub mod repository;
pub mod validate;

pub use error::{PorticoError, PorticoResult};
