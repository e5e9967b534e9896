//! Role-based landing pages and the navigation seam.

use std::sync::Arc;

use tokio::sync::watch;

use stockroom_auth::Role;

use crate::config::Routes;
use crate::types::{SessionSnapshot, SessionState};

/// External navigation collaborator (the UI's router).
pub trait Navigator: Send + Sync {
    /// Go to `path`. With `replace`, the current history entry is replaced so
    /// back-navigation skips intermediate loading/redirect screens.
    fn navigate(&self, path: &str, replace: bool);
}

/// Picks the landing page for a resolved role.
#[derive(Debug, Clone, Default)]
pub struct RoleRouter {
    routes: Routes,
}

impl RoleRouter {
    pub fn new(routes: Routes) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    /// Admin and manager get their own dashboards; every other role, known or
    /// not, lands on the warehouse dashboard.
    pub fn landing_path(&self, role: &Role) -> &str {
        match role {
            Role::Admin => &self.routes.admin_dashboard,
            Role::Manager => &self.routes.manager_dashboard,
            Role::Staff | Role::Warehouse | Role::Unrecognized(_) => {
                &self.routes.warehouse_dashboard
            }
        }
    }

    /// Landing page for an authenticated state; `None` otherwise.
    pub fn landing_for(&self, state: &SessionState) -> Option<&str> {
        state.role().map(|role| self.landing_path(role))
    }

    /// Send an already-resolved session to its landing page (e.g. from the
    /// generic dashboard entry point). Returns whether a navigation happened.
    pub fn route(&self, state: &SessionState, navigator: &dyn Navigator) -> bool {
        match self.landing_for(state) {
            Some(path) => {
                tracing::debug!(path, "routing to role landing page");
                navigator.navigate(path, true);
                true
            }
            None => false,
        }
    }

    /// Route on every sign-in, and on every change of resolved role, until
    /// the session manager goes away.
    ///
    /// The state current at subscription time is routed first. A sign-out
    /// followed straight away by a sign-in with the same role still routes,
    /// even when the receiver never observed the signed-out state.
    pub async fn follow(
        &self,
        mut snapshots: watch::Receiver<SessionSnapshot>,
        navigator: Arc<dyn Navigator>,
    ) {
        let mut routed: Option<(u64, Role)> = None;

        loop {
            let (sign_ins, role) = {
                let snapshot = snapshots.borrow_and_update();
                (snapshot.sign_ins, snapshot.state.role().cloned())
            };
            match role {
                Some(role) if routed.as_ref() != Some(&(sign_ins, role.clone())) => {
                    let path = self.landing_path(&role);
                    tracing::info!(
                        %role,
                        path,
                        sign_ins,
                        "role resolved; routing to landing page"
                    );
                    navigator.navigate(path, true);
                    routed = Some((sign_ins, role));
                }
                Some(_) => {}
                None => routed = None,
            }

            if snapshots.changed().await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_auth::User;

    #[test]
    fn landing_paths_by_role() {
        let router = RoleRouter::default();
        assert_eq!(router.landing_path(&Role::Admin), "/admin/dashboard");
        assert_eq!(router.landing_path(&Role::Manager), "/manager/dashboard");
        assert_eq!(router.landing_path(&Role::Staff), "/warehouse/dashboard");
        assert_eq!(router.landing_path(&Role::Warehouse), "/warehouse/dashboard");
        assert_eq!(
            router.landing_path(&Role::parse("auditor")),
            "/warehouse/dashboard"
        );
    }

    #[test]
    fn only_authenticated_states_have_a_landing_page() {
        let router = RoleRouter::default();
        assert!(router.landing_for(&SessionState::Loading).is_none());
        assert!(router.landing_for(&SessionState::Unauthenticated).is_none());

        let state = SessionState::Authenticated(User::new(1u64, "A", "a@x.com", "admin"));
        assert_eq!(router.landing_for(&state), Some("/admin/dashboard"));
    }

    #[test]
    fn custom_routes_are_respected() {
        let routes = Routes {
            manager_dashboard: "/m".to_string(),
            ..Routes::default()
        };
        let router = RoleRouter::new(routes);
        assert_eq!(router.landing_path(&Role::Manager), "/m");
    }
}
