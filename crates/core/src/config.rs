//! Settings for the PeopleOS client
//!
//! Values are layered: built-in defaults, then an optional settings file,
//! then `PEOPLEOS__*` environment variables (`PEOPLEOS__API__BASE_URL`).
//! `PEOPLEOS_API_URL` is honoured last as a shortcut for the base URL.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Base URL used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Environment variable carrying the API base URL
pub const API_URL_ENV: &str = "PEOPLEOS_API_URL";

/// Environment variable overriding the state directory
pub const STATE_DIR_ENV: &str = "PEOPLEOS_STATE_DIR";

/// Storage key the session token lives under
pub const TOKEN_KEY: &str = "token";

/// Top-level client settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Backend connection settings
    pub api: ApiSettings,

    /// Local session persistence
    pub session: SessionSettings,
}

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every request path is appended to
    pub base_url: String,

    /// Path of the token refresh endpoint
    pub refresh_path: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Optional transport timeout in seconds; unset leaves the transport default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Session persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Directory holding the session file
    pub data_dir: PathBuf,

    /// Key the bearer token is stored under
    pub token_key: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            refresh_path: "/auth/refresh".to_string(),
            user_agent: format!("peopleos-client/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            data_dir: default_state_dir(),
            token_key: TOKEN_KEY.to_string(),
        }
    }
}

/// Resolve the state directory from the environment or the platform data dir
pub fn default_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("peopleos")
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value is invalid
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        Self::load_from(path, std::env::var(API_URL_ENV).ok())
    }

    /// Same as [`Settings::load`] with an explicit base URL override
    pub fn load_from(path: Option<&Path>, api_url: Option<String>) -> CoreResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.refresh_path", defaults.api.refresh_path)?
            .set_default("api.user_agent", defaults.api.user_agent)?
            .set_default(
                "session.data_dir",
                defaults.session.data_dir.to_string_lossy().to_string(),
            )?
            .set_default("session.token_key", defaults.session.token_key)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let mut settings: Settings = builder
            .add_source(config::Environment::with_prefix("PEOPLEOS").separator("__"))
            .build()?
            .try_deserialize()?;

        if let Some(url) = api_url.filter(|url| !url.trim().is_empty()) {
            settings.api.base_url = url;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Check values the client cannot work without
    pub fn validate(&self) -> CoreResult<()> {
        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CoreError::invalid_config(format!(
                "api.base_url must be an http(s) URL, got '{base_url}'"
            )));
        }
        if !self.api.refresh_path.starts_with('/') {
            return Err(CoreError::invalid_config(
                "api.refresh_path must start with '/'",
            ));
        }
        if self.session.token_key.is_empty() {
            return Err(CoreError::invalid_config("session.token_key is empty"));
        }
        Ok(())
    }

    /// Path of the JSON file holding the persisted session
    pub fn session_file(&self) -> PathBuf {
        self.session.data_dir.join("session.json")
    }
}
