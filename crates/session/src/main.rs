//! Session probe: restores the stored session and reports where it lands.
//!
//! `stockroom-session`         restore and report
//! `stockroom-session logout`  clear the stored session

use std::sync::Arc;

use stockroom_session::{
    HttpIdentityService, RoleRouter, SessionConfig, SessionManager, SessionState, SessionStore,
    SqliteBackend,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SessionConfig::from_env()?;
    stockroom_observability::init_with(config.log_format);

    let db_path = config.session_db_path()?;
    tracing::info!(api_url = %config.api_url, db = ?db_path, "starting session probe");

    let manager = SessionManager::builder()
        .identity(Arc::new(HttpIdentityService::new(config.api_url.clone())))
        .store(SessionStore::new(Arc::new(SqliteBackend::open(db_path))))
        .build()?;

    if std::env::args().nth(1).as_deref() == Some("logout") {
        manager.logout().await;
        tracing::info!("stored session cleared");
        return Ok(());
    }

    let router = RoleRouter::new(config.routes.clone());
    match manager.restore().await {
        SessionState::Authenticated(user) => {
            tracing::info!(
                user_id = %user.id,
                email = %user.email,
                role = %user.role,
                landing = router.landing_path(&user.role),
                permissions = ?manager.permissions(),
                "session active"
            );
        }
        state => {
            tracing::info!(
                state = state.as_str(),
                login = %config.routes.login,
                "no active session"
            );
        }
    }

    Ok(())
}
