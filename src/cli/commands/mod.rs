//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod init;
pub mod query;
pub mod set_url;
pub mod status;
pub mod update;
pub mod validate;

use crate::adapters::store::SqliteStore;
use crate::config::{load_config, SyncConfig};
use crate::domain::{Result, StoreError};
use crate::logging::{GroupLogger, LogGroups};
use std::path::Path;
use std::time::Duration;

/// Load the configuration, falling back to defaults when the file is absent
pub(crate) fn load_or_default(config_path: &str) -> Result<SyncConfig> {
    if Path::new(config_path).exists() {
        return load_config(config_path);
    }
    tracing::info!(
        config_path = %config_path,
        "Configuration file not found, using defaults"
    );
    Ok(SyncConfig::default())
}

/// Open the configured SQLite store
pub(crate) fn open_store(config: &SyncConfig) -> std::result::Result<SqliteStore, StoreError> {
    SqliteStore::open(
        &config.store.path,
        Duration::from_millis(config.store.busy_timeout_ms),
    )
}

pub(crate) fn group_logger(config: &SyncConfig) -> GroupLogger {
    GroupLogger::new(LogGroups::from_config(&config.logging.groups))
}
