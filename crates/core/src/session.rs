//! Session token persistence
//!
//! The client keeps exactly one bearer token. It is read on every request,
//! replaced on login and refresh, and removed on logout or when the session
//! ends. Stores are shared between the request path and the refresh
//! coordinator, so reads must be cheap and never block on a writer.

use crate::error::{CoreError, CoreResult};
use arc_swap::ArcSwapOption;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage for the session's bearer token
pub trait TokenStore: Send + Sync + Debug {
    /// Current token, if any
    fn get(&self) -> Option<String>;

    /// Replace the stored token
    fn set(&self, token: &str) -> CoreResult<()>;

    /// Remove the stored token
    fn clear(&self) -> CoreResult<()>;

    /// Whether a token is stored
    fn has_token(&self) -> bool {
        self.get().is_some()
    }
}

/// Token store that lives for the process lifetime
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: ArcSwapOption<String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: ArcSwapOption::from_pointee(token.into()),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.load_full().map(|token| token.as_ref().clone())
    }

    fn set(&self, token: &str) -> CoreResult<()> {
        self.token.store(Some(Arc::new(token.to_string())));
        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        self.token.store(None);
        Ok(())
    }
}

/// Token store backed by a JSON object file
///
/// The file maps storage keys to strings, so one session file can hold
/// entries for more than one key. Reads are served from a cache that is
/// populated when the store is opened.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
    cache: ArcSwapOption<String>,
}

impl FileTokenStore {
    /// Open the store at `path`, loading any token saved under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is not a JSON object
    pub fn open(path: impl AsRef<Path>, key: impl Into<String>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let key = key.into();
        let entries = read_entries(&path)?;
        let token = entries
            .get(&key)
            .and_then(Value::as_str)
            .map(|token| Arc::new(token.to_string()));

        debug!(path = %path.display(), key = %key, loaded = token.is_some(), "Opened session store");

        Ok(Self {
            path,
            key,
            cache: ArcSwapOption::new(token),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_entry(&self, value: Option<&str>) -> CoreResult<()> {
        let mut entries = match read_entries(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable session file");
                Map::new()
            }
        };

        match value {
            Some(token) => {
                entries.insert(self.key.clone(), Value::String(token.to_string()));
            }
            None => {
                entries.remove(&self.key);
            }
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write through a sibling file so a crash never leaves half a document
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(entries))?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        self.cache.load_full().map(|token| token.as_ref().clone())
    }

    fn set(&self, token: &str) -> CoreResult<()> {
        self.write_entry(Some(token))?;
        self.cache.store(Some(Arc::new(token.to_string())));
        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        // Forget the token even if the file cannot be rewritten
        self.cache.store(None);
        self.write_entry(None)
    }
}

fn read_entries(path: &Path) -> CoreResult<Map<String, Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(e.into()),
    };

    if content.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str(&content)? {
        Value::Object(entries) => Ok(entries),
        _ => Err(CoreError::serialization_error(format!(
            "session file {} is not a JSON object",
            path.display()
        ))),
    }
}
