//! `stockroom-core` — shared building blocks for the stockroom client.
//!
//! This crate contains **pure** primitives (no IO, no async, no storage).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::UserId;
