//! Login redirects for terminal authentication failures

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Login entry point
pub const LOGIN_PATH: &str = "/login";

/// Build the login navigation target, carrying `message` as `?error=`
pub fn login_redirect(message: Option<&str>) -> String {
    match message.map(str::trim).filter(|message| !message.is_empty()) {
        Some(message) => format!("{LOGIN_PATH}?error={}", urlencoding::encode(message)),
        None => LOGIN_PATH.to_string(),
    }
}

/// Receives navigation requests issued when a session ends
pub trait Navigator: Send + Sync + Debug {
    /// Send the user to `target`
    fn navigate(&self, target: &str);
}

/// Navigator that logs and remembers every target in order
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    targets: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every target navigated to so far
    pub fn targets(&self) -> Vec<String> {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent target
    pub fn last_target(&self) -> Option<String> {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &str) {
        info!(target = %target, "Redirecting to login");
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.to_string());
    }
}
