//! Durable session persistence.
//!
//! [`SessionStore`] is the only component that touches durable storage. It
//! keeps two string entries, `token` and `user`, in a [`StorageBackend`] and
//! never surfaces a failure to callers: storage errors are logged and reads
//! degrade to "absent".

use std::sync::Arc;

use async_trait::async_trait;

use stockroom_auth::User;

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryBackend;
pub use sqlite::SqliteBackend;

/// Key of the credential token entry.
pub const TOKEN_KEY: &str = "token";
/// Key of the serialized user record entry.
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// String key/value storage that survives process restarts.
///
/// Each call is atomic for its single key; nothing spans two keys.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Token + cached user mirror over a [`StorageBackend`].
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn StorageBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by process memory (tests/dev).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    /// Write the token, then the serialized user. Overwrites existing entries.
    pub async fn save_session(&self, token: &str, user: &User) {
        if let Err(err) = self.backend.set(TOKEN_KEY, token).await {
            tracing::error!("failed to persist session token: {err}");
        }

        match serde_json::to_string(user) {
            Ok(payload) => {
                if let Err(err) = self.backend.set(USER_KEY, &payload).await {
                    tracing::error!("failed to persist cached user: {err}");
                }
            }
            Err(err) => tracing::error!("failed to serialize user for session store: {err}"),
        }
    }

    /// Refresh only the cached user mirror.
    pub async fn save_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(payload) => {
                if let Err(err) = self.backend.set(USER_KEY, &payload).await {
                    tracing::error!("failed to refresh cached user: {err}");
                }
            }
            Err(err) => tracing::error!("failed to serialize user for session store: {err}"),
        }
    }

    /// Remove both entries. Idempotent.
    pub async fn clear_session(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.backend.remove(key).await {
                tracing::error!(key, "failed to clear session entry: {err}");
            }
        }
    }

    pub async fn read_token(&self) -> Option<String> {
        match self.backend.get(TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(err) => {
                tracing::warn!("failed to read session token, treating as absent: {err}");
                None
            }
        }
    }

    /// Best-effort read of the cached user; malformed data reads as absent.
    pub async fn read_cached_user(&self) -> Option<User> {
        let raw = match self.backend.get(USER_KEY).await {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!("failed to read cached user, treating as absent: {err}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::warn!("cached user is malformed, ignoring it: {err}");
                None
            }
        }
    }
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}
