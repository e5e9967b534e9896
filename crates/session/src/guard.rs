//! Route guard: what to do with a request for a protected screen.

use serde::Serialize;

use stockroom_auth::RoleRequirement;

use crate::config::Routes;
use crate::manager::SessionManager;
use crate::router::Navigator;
use crate::types::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    /// Session is still resolving: show a spinner, neither render nor redirect.
    ShowLoading,
    RedirectToLogin,
    RedirectToUnauthorized,
    Render,
}

/// Pure decision over (session state, required roles). No IO.
pub fn evaluate(state: &SessionState, required: &RoleRequirement) -> GuardDecision {
    match state {
        SessionState::Loading => GuardDecision::ShowLoading,
        SessionState::Unauthenticated => GuardDecision::RedirectToLogin,
        SessionState::Authenticated(user) => {
            if required.is_unrestricted() || required.admits(&user.role) {
                GuardDecision::Render
            } else {
                GuardDecision::RedirectToUnauthorized
            }
        }
    }
}

impl GuardDecision {
    pub fn should_render(&self) -> bool {
        matches!(self, GuardDecision::Render)
    }

    /// Redirect target, if this decision is a redirect.
    pub fn redirect_target<'a>(&self, routes: &'a Routes) -> Option<&'a str> {
        match self {
            GuardDecision::RedirectToLogin => Some(&routes.login),
            GuardDecision::RedirectToUnauthorized => Some(&routes.unauthorized),
            GuardDecision::ShowLoading | GuardDecision::Render => None,
        }
    }

    /// Carry out a redirect decision. Redirects replace the current history
    /// entry. Returns whether the protected screen should render.
    pub fn apply(&self, routes: &Routes, navigator: &dyn Navigator) -> bool {
        if let Some(target) = self.redirect_target(routes) {
            tracing::debug!(decision = ?self, path = target, "route guard redirect");
            navigator.navigate(target, true);
        }
        self.should_render()
    }
}

/// Guard for one screen.
#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    required: RoleRequirement,
}

impl RouteGuard {
    /// Any authenticated user may enter.
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn requiring(required: impl Into<RoleRequirement>) -> Self {
        Self {
            required: required.into(),
        }
    }

    pub fn required(&self) -> &RoleRequirement {
        &self.required
    }

    pub fn check(&self, session: &SessionManager) -> GuardDecision {
        evaluate(&session.state(), &self.required)
    }
}
