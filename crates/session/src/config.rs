//! Session layer configuration.
//!
//! Read from the environment with defaults suitable for local development:
//!
//! | variable | default |
//! |---|---|
//! | `STOCKROOM_API_URL` | `http://localhost:8080` |
//! | `STOCKROOM_SESSION_DB` | `{app_data_dir}/stockroom/session.db` |
//! | `STOCKROOM_LOG_FORMAT` | `json` |

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_observability::LogFormat;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The session manager was wired without an identity service.
    #[error("session manager requires an identity service")]
    MissingIdentityService,

    /// The session manager was wired without a session store.
    #[error("session manager requires a session store")]
    MissingSessionStore,

    #[error("invalid API URL '{0}': expected an http:// or https:// URL")]
    InvalidApiUrl(String),

    #[error("invalid log format: {0}")]
    InvalidLogFormat(String),

    #[error("cannot resolve session database path: {0}")]
    SessionPath(String),
}

/// Navigation targets the guard and the role router send users to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routes {
    pub login: String,
    pub unauthorized: String,
    /// Generic entry point that forwards to the role's landing page.
    pub dashboard: String,
    pub admin_dashboard: String,
    pub manager_dashboard: String,
    pub warehouse_dashboard: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            unauthorized: "/unauthorized".to_string(),
            dashboard: "/dashboard".to_string(),
            admin_dashboard: "/admin/dashboard".to_string(),
            manager_dashboard: "/manager/dashboard".to_string(),
            warehouse_dashboard: "/warehouse/dashboard".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub api_url: String,
    /// `None` means the platform default location.
    pub session_db: Option<PathBuf>,
    pub log_format: LogFormat,
    pub routes: Routes,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_db: None,
            log_format: LogFormat::default(),
            routes: Routes::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = match var("STOCKROOM_API_URL") {
            Some(url) => validate_api_url(url.trim())?,
            None => DEFAULT_API_URL.to_string(),
        };

        let log_format = match var("STOCKROOM_LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::InvalidLogFormat(e.to_string()))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            api_url,
            session_db: var("STOCKROOM_SESSION_DB").map(PathBuf::from),
            log_format,
            routes: Routes::default(),
        })
    }

    /// Configured database path, or the platform default.
    pub fn session_db_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.session_db {
            Some(path) => Ok(path.clone()),
            None => crate::store::sqlite::default_db_path()
                .map_err(|e| ConfigError::SessionPath(format!("{e:#}"))),
        }
    }
}

fn validate_api_url(url: &str) -> Result<String, ConfigError> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| ConfigError::InvalidApiUrl(url.to_string()))?;
    if rest.trim_matches('/').is_empty() {
        return Err(ConfigError::InvalidApiUrl(url.to_string()));
    }
    Ok(url.trim_end_matches('/').to_string())
}
