//! `stockroom-session`
//!
//! **Responsibility:** client-side session and authorization state.
//!
//! This crate provides:
//! - Durable token + cached user persistence ([`SessionStore`])
//! - The session state machine and authorization queries ([`SessionManager`])
//! - Screen gating ([`RouteGuard`]) and role landing pages ([`RoleRouter`])
//!
//! Decisions made here gate the UI only; the server remains the authority.

pub mod config;
pub mod guard;
#[cfg(feature = "http")]
pub mod http;
pub mod identity;
pub mod manager;
pub mod router;
pub mod store;
pub mod types;

pub use config::{ConfigError, Routes, SessionConfig};
pub use guard::{GuardDecision, RouteGuard};
#[cfg(feature = "http")]
pub use http::HttpIdentityService;
pub use identity::{AuthPayload, IdentityError, IdentityService};
pub use manager::{SessionManager, SessionManagerBuilder};
pub use router::{Navigator, RoleRouter};
pub use store::{InMemoryBackend, SessionStore, SqliteBackend, StorageBackend, StorageError};
pub use types::{AuthOutcome, SessionSnapshot, SessionState};
