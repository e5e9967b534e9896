//! SQLite-backed storage so a session survives restarts.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::Mutex;

use super::{StorageBackend, StorageError};

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Key/value table in a local SQLite database.
///
/// The pool is opened lazily on first use; the handle is cheap to clone.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    location: Location,
    pool: Arc<Mutex<Option<SqlitePool>>>,
}

impl SqliteBackend {
    /// Backend stored at `path` (created on first use).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            pool: Arc::new(Mutex::new(None)),
        }
    }

    /// Backend in a private in-memory database (tests).
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            pool: Arc::new(Mutex::new(None)),
        }
    }

    async fn get_pool(&self) -> anyhow::Result<SqlitePool> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let options = match &self.location {
            Location::File(path) => {
                ensure_parent_dir(path)?;
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
            }
            Location::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .context("invalid in-memory SQLite URL")?,
        };

        // One connection: every in-memory connection would otherwise get its own
        // database, and writes are serialised by the session manager anyway.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open session database at {:?}", self.location))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_entries (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create session_entries table")?;

        tracing::debug!(location = ?self.location, "session database ready");
        *guard = Some(pool.clone());
        Ok(pool)
    }

    async fn try_get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let pool = self.get_pool().await?;
        let row = sqlx::query(
            r#"
            SELECT value
            FROM session_entries
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&pool)
        .await
        .context("failed to read session entry")?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn try_set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let pool = self.get_pool().await?;
        sqlx::query(
            r#"
            INSERT INTO session_entries (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key)
            DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&pool)
        .await
        .context("failed to upsert session entry")?;
        Ok(())
    }

    async fn try_remove(&self, key: &str) -> anyhow::Result<()> {
        let pool = self.get_pool().await?;
        sqlx::query(
            r#"
            DELETE FROM session_entries
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .execute(&pool)
        .await
        .context("failed to delete session entry")?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.try_get(key).await.map_err(backend_error)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.try_set(key, value).await.map_err(backend_error)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.try_remove(key).await.map_err(backend_error)
    }
}

fn backend_error(err: anyhow::Error) -> StorageError {
    StorageError::Backend(format!("{err:#}"))
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create session directory at {:?}", parent))?;
    }
    Ok(())
}

/// Default database location: `{app_data_dir}/stockroom/session.db`.
pub fn default_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory (data_dir or ~/.local/share)")?;

    let mut path = base;
    path.push("stockroom");
    path.push("session.db");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SessionStore;
    use stockroom_auth::{Role, User};

    #[tokio::test]
    async fn upsert_and_delete() {
        let backend = SqliteBackend::in_memory();
        assert!(backend.get("token").await.unwrap().is_none());

        backend.set("token", "abc").await.unwrap();
        backend.set("token", "def").await.unwrap();
        assert_eq!(backend.get("token").await.unwrap().as_deref(), Some("def"));

        backend.remove("token").await.unwrap();
        backend.remove("token").await.unwrap();
        assert!(backend.get("token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_round_trip_through_sqlite() {
        let store = SessionStore::new(Arc::new(SqliteBackend::in_memory()));
        let user = User::new(1u64, "A", "a@x.com", Role::Admin);

        store.save_session("abc", &user).await;
        assert_eq!(store.read_token().await.as_deref(), Some("abc"));
        assert_eq!(store.read_cached_user().await, Some(user));

        store.clear_session().await;
        assert!(store.read_token().await.is_none());
    }

    #[tokio::test]
    async fn unopenable_file_degrades_to_absent() {
        // A directory cannot be opened as a database file.
        let dir = std::env::temp_dir();
        let store = SessionStore::new(Arc::new(SqliteBackend::open(dir)));
        assert!(store.read_token().await.is_none());
    }

    #[test]
    fn default_path_ends_in_session_db() {
        if let Ok(path) = default_db_path() {
            assert!(path.ends_with("stockroom/session.db"));
        }
    }
}
