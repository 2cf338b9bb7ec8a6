//! CLI configuration utilities

use anyhow::{Context, Result};
use peopleos_core::{FileTokenStore, Settings};
use peopleos_http::{ApiClient, ApiClientBuilder, RecordingNavigator};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolve settings from the config file, environment and command-line overrides
pub fn resolve_settings(
    config: Option<&Path>,
    api_url: Option<String>,
    data_dir: Option<PathBuf>,
) -> Result<Settings> {
    let mut settings =
        Settings::load_from(config, api_url).context("Failed to load configuration")?;
    if let Some(dir) = data_dir {
        settings.session.data_dir = dir;
    }
    Ok(settings)
}

/// Build a client whose session survives between invocations
pub fn connect(settings: &Settings) -> Result<ApiClient> {
    let session_file = settings.session_file();
    let store = FileTokenStore::open(&session_file, settings.session.token_key.clone())
        .with_context(|| format!("Failed to open session file {}", session_file.display()))?;

    let client = ApiClientBuilder::from_settings(&settings.api)
        .token_store(Arc::new(store))
        .navigator(Arc::new(RecordingNavigator::new()))
        .build()?;
    Ok(client)
}
