//! Portico Auth: signed link tokens, password hashing, sessions, CSRF
//! primitives, tenant resolution, signup issuance and provisioning.

pub mod config;
pub mod csrf;
pub mod error;
pub mod password;
pub mod provisioning;
pub mod service;
pub mod session;
pub mod signup;
pub mod tenancy;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use provisioning::{ProvisionOutcome, ProvisioningService, RejectReason};
pub use service::{AuthService, LoginInput, LoginOutput};
pub use session::{ActiveSession, IssuedSession, SessionManager};
pub use signup::{EnrollInput, IssuedSignup, LinkBase, RegisterInput, SignupService};
pub use tenancy::{DomainMismatch, SubdomainDirectory, TenantDirectory};
pub use token::{SignupClaims, TokenCodec};
