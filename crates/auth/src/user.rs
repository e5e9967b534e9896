//! User record and credential inputs.

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, UserId};

use crate::Role;

/// Authenticated user as reported by the identity service.
///
/// # Invariants
/// - `role` is never blank: a missing, null or empty role deserializes as
///   [`Role::Warehouse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn new(
        id: impl Into<UserId>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<Role>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: role.into(),
        }
    }
}

/// Login form input.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Reject obviously incomplete input before it reaches the identity service.
    pub fn validate(&self) -> DomainResult<()> {
        if self.email.trim().is_empty() {
            return Err(DomainError::validation("Email is required"));
        }
        if self.password.is_empty() {
            return Err(DomainError::validation("Password is required"));
        }
        Ok(())
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Signup form input.
#[derive(Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl SignupRequest {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<Role>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: role.into(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("Name is required"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("A valid email is required"));
        }
        if self.password.is_empty() {
            return Err(DomainError::validation("Password is required"));
        }
        Ok(())
    }
}

impl core::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}
