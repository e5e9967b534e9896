//! Session state machine.
//!
//! The [`SessionManager`] owns the in-memory session (state + token), talks to
//! the identity service, mirrors results into the [`SessionStore`] and answers
//! every "may this user..." question the UI asks.
//!
//! One manager exists per running UI and is handed to consumers explicitly
//! (usually behind an `Arc`). Wiring mistakes surface from
//! [`SessionManagerBuilder::build`], never from a query.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, watch};

use stockroom_auth::{
    AuthorizationExplanation, Credentials, Permission, Role, RoleRequirement, SignupRequest, User,
    explain_authorization, permissions_for,
};

use crate::config::ConfigError;
use crate::identity::{AuthPayload, IdentityError, IdentityService};
use crate::store::SessionStore;
use crate::types::{AuthOutcome, SessionSnapshot, SessionState};

/// Collects the manager's collaborators.
#[derive(Default)]
pub struct SessionManagerBuilder {
    identity: Option<Arc<dyn IdentityService>>,
    store: Option<SessionStore>,
}

impl SessionManagerBuilder {
    pub fn identity(mut self, identity: Arc<dyn IdentityService>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Fails fast when a collaborator is missing.
    ///
    /// The manager starts in [`SessionState::Loading`] until
    /// [`SessionManager::restore`] has looked at the stored token, so no
    /// consumer redirects before hydration.
    pub fn build(self) -> Result<SessionManager, ConfigError> {
        let identity = self.identity.ok_or(ConfigError::MissingIdentityService)?;
        let store = self.store.ok_or(ConfigError::MissingSessionStore)?;
        let (state, _) = watch::channel(SessionSnapshot::initial());

        Ok(SessionManager {
            identity,
            store,
            state,
            token: RwLock::new(None),
            ops: Mutex::new(()),
            busy: AtomicBool::new(false),
        })
    }

    /// Build, then run startup restoration.
    pub async fn start(self) -> Result<Arc<SessionManager>, ConfigError> {
        let manager = Arc::new(self.build()?);
        manager.restore().await;
        Ok(manager)
    }
}

pub struct SessionManager {
    identity: Arc<dyn IdentityService>,
    store: SessionStore,
    state: watch::Sender<SessionSnapshot>,
    /// Authoritative in-memory token; the store holds the durable mirror.
    token: RwLock<Option<String>>,
    /// Serialises identity round trips and store writes.
    ops: Mutex<()>,
    busy: AtomicBool,
}

/// Raises the busy flag for the lifetime of one identity round trip.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SessionManager {
    pub fn builder() -> SessionManagerBuilder {
        SessionManagerBuilder::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Rehydrate the session from the stored token.
    ///
    /// - No stored token: `Unauthenticated`, no identity call.
    /// - Token accepted: `Authenticated`, cached user refreshed.
    /// - Any identity error: store cleared, `Unauthenticated`. Never retried.
    ///
    /// Always ends in a terminal state. Calling it again for a token that is
    /// already authenticated does not hit the identity service.
    pub async fn restore(&self) -> SessionState {
        let _op = self.ops.lock().await;

        let Some(token) = self.store.read_token().await else {
            tracing::info!("no stored session token; starting unauthenticated");
            // A user record without its token is an orphan from a partial write.
            self.store.clear_session().await;
            self.clear_token();
            self.transition(SessionState::Unauthenticated);
            return self.state();
        };

        if self.is_authenticated() && self.token().as_deref() == Some(token.as_str()) {
            tracing::debug!("session already restored for the stored token");
            return self.state();
        }

        self.transition(SessionState::Loading);
        tracing::info!("restoring session from stored token");

        let result = {
            let _busy = BusyGuard::raise(&self.busy);
            self.identity.current_user(&token).await
        };

        match result {
            Ok(user) => {
                self.store.save_user(&user).await;
                self.set_token(token);
                tracing::info!(user_id = %user.id, role = %user.role, "session restored");
                self.sign_in(user);
            }
            Err(err) => {
                tracing::warn!(error = %err, "session restoration failed; clearing stored session");
                self.store.clear_session().await;
                self.clear_token();
                self.transition(SessionState::Unauthenticated);
            }
        }

        self.state()
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        let credentials = Credentials::new(email, password);
        if let Err(err) = credentials.validate() {
            return AuthOutcome::failure(err.to_string());
        }

        let _op = self.ops.lock().await;
        let result = {
            let _busy = BusyGuard::raise(&self.busy);
            self.identity.login(&credentials).await
        };
        self.settle("login", result).await
    }

    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: impl Into<Role>,
    ) -> AuthOutcome {
        let request = SignupRequest::new(name, email, password, role);
        if let Err(err) = request.validate() {
            return AuthOutcome::failure(err.to_string());
        }

        let _op = self.ops.lock().await;
        let result = {
            let _busy = BusyGuard::raise(&self.busy);
            self.identity.signup(&request).await
        };
        self.settle("signup", result).await
    }

    /// Drop the session locally. No network call; cannot fail.
    pub async fn logout(&self) {
        let _op = self.ops.lock().await;
        self.store.clear_session().await;
        self.clear_token();
        if self.transition(SessionState::Unauthenticated) {
            tracing::info!("logged out");
        }
    }

    async fn settle(
        &self,
        operation: &'static str,
        result: Result<AuthPayload, IdentityError>,
    ) -> AuthOutcome {
        match result {
            Ok(AuthPayload { token, user }) => {
                self.store.save_session(&token, &user).await;
                self.set_token(token);
                tracing::info!(operation, user_id = %user.id, role = %user.role, "authenticated");
                self.sign_in(user.clone());
                AuthOutcome::Success { user }
            }
            Err(err) => {
                tracing::warn!(operation, error = %err, "authentication failed");
                AuthOutcome::failure(err.to_string())
            }
        }
    }

    /// Publish `next`; returns whether the state actually changed.
    fn transition(&self, next: SessionState) -> bool {
        self.state.send_if_modified(|current| {
            if current.state == next {
                return false;
            }
            tracing::debug!(
                from = current.state.as_str(),
                to = next.as_str(),
                "session transition"
            );
            current.state = next;
            true
        })
    }

    /// Every successful authentication is a new sign-in, even when the
    /// resulting state equals the previous one.
    fn sign_in(&self, user: User) {
        self.state.send_modify(|current| {
            tracing::debug!(
                from = current.state.as_str(),
                to = "authenticated",
                "session transition"
            );
            current.sign_ins += 1;
            current.state = SessionState::Authenticated(user);
        });
    }

    fn set_token(&self, token: String) {
        match self.token.write() {
            Ok(mut guard) => *guard = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }

    fn clear_token(&self) {
        match self.token.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries (synchronous, never block on IO, never fail)
    // ─────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state.borrow().state.clone()
    }

    /// Receiver that observes every transition, for dependents that re-render.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// True only in `Authenticated`; a stored token being validated does not count.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().state.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().state.is_loading()
    }

    /// True while an identity-service round trip is outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().state.user().cloned()
    }

    pub fn role(&self) -> Option<Role> {
        self.state.borrow().state.role().cloned()
    }

    /// Bearer token for authenticated API calls; `None` unless authenticated.
    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn has_role(&self, required: impl Into<RoleRequirement>) -> bool {
        stockroom_auth::has_role(self.state.borrow().state.user(), required)
    }

    pub fn can(&self, action: &str) -> bool {
        stockroom_auth::can(self.state.borrow().state.user(), action)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_manager(&self) -> bool {
        self.has_role(Role::Manager)
    }

    pub fn is_warehouse_or_staff(&self) -> bool {
        self.has_role([Role::Warehouse, Role::Staff])
    }

    /// Actions the current user may perform, sorted; empty when signed out.
    pub fn permissions(&self) -> Vec<Permission> {
        let snapshot = self.state.borrow();
        let Some(role) = snapshot.state.role() else {
            return Vec::new();
        };
        let mut perms: Vec<Permission> = permissions_for(role).iter().cloned().collect();
        perms.sort();
        perms
    }

    pub fn explain(&self, action: &str) -> AuthorizationExplanation {
        explain_authorization(self.state.borrow().state.user(), action)
    }
}

impl core::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state.borrow().state.as_str())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryBackend, StorageBackend, USER_KEY};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Identity service answering every call with the same canned result.
    struct Fixed {
        result: Result<AuthPayload, IdentityError>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn ok(token: &str, user: User) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(AuthPayload {
                    token: token.to_string(),
                    user,
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(message: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Err(IdentityError::Rejected(message.to_string())),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityService for Fixed {
        async fn login(&self, _c: &Credentials) -> Result<AuthPayload, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }

        async fn signup(&self, _r: &SignupRequest) -> Result<AuthPayload, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }

        async fn current_user(&self, _token: &str) -> Result<User, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map(|p| p.user)
        }
    }

    fn staff() -> User {
        User::new(4u64, "S", "s@x.com", Role::Staff)
    }

    fn manager_with(identity: Arc<Fixed>, store: SessionStore) -> SessionManager {
        SessionManager::builder()
            .identity(identity)
            .store(store)
            .build()
            .unwrap()
    }

    #[test]
    fn build_requires_identity_service() {
        let err = SessionManager::builder()
            .store(SessionStore::in_memory())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingIdentityService);
    }

    #[test]
    fn build_requires_store() {
        let err = SessionManager::builder()
            .identity(Fixed::err("unused"))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingSessionStore);
    }

    #[tokio::test]
    async fn starts_loading_until_restored() {
        let manager = manager_with(Fixed::err("unused"), SessionStore::in_memory());
        assert!(manager.is_loading());
        assert!(!manager.is_authenticated());

        assert_eq!(manager.restore().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn restore_without_token_drops_orphaned_user() {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .set(USER_KEY, &serde_json::to_string(&staff()).unwrap())
            .await
            .unwrap();
        let identity = Fixed::ok("abc", staff());
        let manager = manager_with(identity.clone(), SessionStore::new(backend.clone()));

        assert_eq!(manager.restore().await, SessionState::Unauthenticated);
        assert_eq!(identity.calls(), 0);
        assert!(backend.get(USER_KEY).await.unwrap().is_none());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn every_sign_in_is_counted() {
        let manager = manager_with(Fixed::ok("tok", staff()), SessionStore::in_memory());
        let rx = manager.subscribe();
        manager.restore().await;
        assert_eq!(rx.borrow().sign_ins, 0);

        manager.login("s@x.com", "p").await;
        assert_eq!(rx.borrow().sign_ins, 1);

        manager.logout().await;
        manager.login("s@x.com", "p").await;
        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.sign_ins, 2);
        assert_eq!(snapshot.state, SessionState::Authenticated(staff()));
    }

    #[tokio::test]
    async fn restore_twice_for_same_token_calls_once() {
        let store = SessionStore::in_memory();
        store.save_session("abc", &staff()).await;
        let identity = Fixed::ok("abc", staff());
        let manager = manager_with(identity.clone(), store);

        manager.restore().await;
        manager.restore().await;
        assert_eq!(identity.calls(), 1);
        assert!(manager.is_authenticated());
        assert_eq!(manager.token().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn login_failure_leaves_state_and_store_alone() {
        let store = SessionStore::in_memory();
        let manager = manager_with(Fixed::err("Invalid email or password"), store.clone());
        manager.restore().await;

        let outcome = manager.login("a@x.com", "wrong").await;
        assert_eq!(outcome.message(), Some("Invalid email or password"));
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert!(store.read_token().await.is_none());
        assert!(!manager.is_busy());
    }

    #[tokio::test]
    async fn invalid_input_skips_identity_service() {
        let identity = Fixed::ok("abc", staff());
        let manager = manager_with(identity.clone(), SessionStore::in_memory());
        manager.restore().await;

        let outcome = manager.login("", "p").await;
        assert_eq!(outcome.message(), Some("Email is required"));

        let outcome = manager.signup("S", "nope", "p", "staff").await;
        assert_eq!(outcome.message(), Some("A valid email is required"));

        assert_eq!(identity.calls(), 0);
    }

    #[tokio::test]
    async fn signup_authenticates_and_persists() {
        let store = SessionStore::in_memory();
        let manager = manager_with(Fixed::ok("tok", staff()), store.clone());
        manager.restore().await;

        let outcome = manager.signup("S", "s@x.com", "p", "staff").await;
        assert_eq!(outcome.user(), Some(&staff()));
        assert!(manager.is_warehouse_or_staff());
        assert!(!manager.is_admin());
        assert!(manager.can("perform_picking"));
        assert_eq!(store.read_token().await.as_deref(), Some("tok"));
        assert_eq!(store.read_cached_user().await, Some(staff()));
    }

    #[tokio::test]
    async fn logout_clears_everything_and_is_idempotent() {
        let store = SessionStore::in_memory();
        let manager = manager_with(Fixed::ok("tok", staff()), store.clone());
        manager.restore().await;
        manager.login("s@x.com", "p").await;

        let mut rx = manager.subscribe();
        rx.borrow_and_update();

        manager.logout().await;
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert!(manager.token().is_none());
        assert!(store.read_token().await.is_none());
        assert!(store.read_cached_user().await.is_none());

        manager.logout().await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn queries_are_false_when_signed_out() {
        let manager = manager_with(Fixed::err("unused"), SessionStore::in_memory());
        manager.restore().await;

        assert!(!manager.has_role(["admin", "manager", "staff", "warehouse"]));
        assert!(!manager.can("view_tasks"));
        assert!(!manager.is_warehouse_or_staff());
        assert!(manager.permissions().is_empty());
        assert!(manager.current_user().is_none());
        assert!(!manager.explain("view_tasks").granted);
    }

    #[tokio::test]
    async fn permissions_lists_role_actions() {
        let manager = manager_with(Fixed::ok("tok", staff()), SessionStore::in_memory());
        manager.restore().await;
        manager.login("s@x.com", "p").await;

        let names: Vec<String> = manager
            .permissions()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["perform_packing", "perform_picking", "view_products", "view_tasks"]
        );
    }
}
