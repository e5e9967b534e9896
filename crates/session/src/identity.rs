//! Seam to the external identity service.
//!
//! The session layer only knows these three calls. Transport lives behind the
//! trait (see [`crate::http`] for the HTTP client).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_auth::{Credentials, SignupRequest, User};

/// Token and user returned by a successful login or signup.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

impl core::fmt::Debug for AuthPayload {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthPayload")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Failure reported by (or while reaching) the identity service.
///
/// `Display` is the human-readable message shown to the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The service answered and refused; the message is its own.
    #[error("{0}")]
    Rejected(String),

    #[error("Unable to reach the server: {0}")]
    Network(String),

    #[error("Unexpected response from the server: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, IdentityError>;

    async fn signup(&self, request: &SignupRequest) -> Result<AuthPayload, IdentityError>;

    /// Resolve the user a previously issued token belongs to.
    async fn current_user(&self, token: &str) -> Result<User, IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_message_is_verbatim() {
        let err = IdentityError::Rejected("Invalid email or password".to_string());
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[test]
    fn payload_debug_hides_token() {
        let payload = AuthPayload {
            token: "secret-token".to_string(),
            user: User::new(1u64, "A", "a@x.com", "staff"),
        };
        assert!(!format!("{payload:?}").contains("secret-token"));
    }
}
