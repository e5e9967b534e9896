//! `stockroom-auth` — pure authorization boundary for the stockroom client.
//!
//! This crate is intentionally decoupled from HTTP, storage and async. Its
//! answers are advisory (UI gating only); the server enforces the real policy.

pub mod authorize;
pub mod catalog;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{
    AuthorizationExplanation, AuthzError, DenialKind, RbacRegistry, authorize, can,
    explain_authorization, has_role,
};
pub use catalog::{PermissionCatalog, permissions_for};
pub use permissions::Permission;
pub use roles::{Role, RoleRequirement};
pub use user::{Credentials, SignupRequest, User};
