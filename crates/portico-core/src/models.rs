//! Domain models for Portico.
//!
//! These are the core types shared across all crates.

pub mod membership;
pub mod pending_signup;
pub mod provisioning;
pub mod session;
pub mod tenant;
pub mod user;
