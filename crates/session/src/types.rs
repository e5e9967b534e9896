//! Shared session types.
//!
//! These carry no IO and are what UI code renders from.

use serde::Serialize;

use stockroom_auth::{Role, User};

/// Where the session currently stands.
///
/// Exactly one variant holds at any instant. Only [`crate::SessionManager`]
/// moves between them; the state is never persisted, it is derived at startup
/// from whether a token was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "user", rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    /// A stored token is being validated against the identity service.
    Loading,
    Authenticated(User),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<&Role> {
        self.user().map(|u| &u.role)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Loading => "loading",
            SessionState::Authenticated(_) => "authenticated",
        }
    }
}

/// What the manager publishes to subscribers: the state plus a count of
/// successful sign-ins.
///
/// Subscribers may miss intermediate states (a sign-out immediately followed
/// by a sign-in); a changed `sign_ins` still tells them a new session began.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub sign_ins: u64,
}

impl SessionSnapshot {
    pub(crate) fn initial() -> Self {
        Self {
            state: SessionState::Loading,
            sign_ins: 0,
        }
    }
}

/// Result of a login or signup attempt.
///
/// Failures are values, never errors: the form shows `message` and lets the
/// user retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthOutcome {
    Success { user: User },
    Failure { message: String },
}

impl AuthOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        AuthOutcome::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success { .. })
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            AuthOutcome::Success { user } => Some(user),
            AuthOutcome::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            AuthOutcome::Success { .. } => None,
            AuthOutcome::Failure { message } => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_authenticated_counts() {
        assert!(!SessionState::Loading.is_authenticated());
        assert!(!SessionState::Unauthenticated.is_authenticated());
        let state = SessionState::Authenticated(User::new(1u64, "A", "a@x.com", "staff"));
        assert!(state.is_authenticated());
        assert_eq!(state.role(), Some(&Role::Staff));
    }

    #[test]
    fn state_serializes_with_status_tag() {
        let json = serde_json::to_value(SessionState::Loading).unwrap();
        assert_eq!(json["status"], "loading");

        let state = SessionState::Authenticated(User::new(1u64, "A", "a@x.com", "admin"));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "authenticated");
        assert_eq!(json["user"]["role"], "admin");
    }

    #[test]
    fn failure_outcome_carries_message() {
        let outcome = AuthOutcome::failure("Invalid credentials");
        assert!(!outcome.is_success());
        assert_eq!(outcome.message(), Some("Invalid credentials"));
        assert!(outcome.user().is_none());
    }
}
