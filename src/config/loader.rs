//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{ChangeStrategy, SyncConfig};
use crate::domain::errors::SyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`SyncConfig`]
/// 4. Applies environment variable overrides (`GTFS_SYNC_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`SyncError::Configuration`] if the file is missing or unreadable,
/// a referenced variable is unset, parsing fails or validation fails.
///
/// # Examples
///
/// ```no_run
/// use gtfs_sync::config::loader::load_config;
///
/// let config = load_config("gtfs-sync.toml").expect("Failed to load config");
/// println!("Store: {}", config.store.path);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<SyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: SyncConfig = toml::from_str(&contents)
        .map_err(|e| SyncError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        SyncError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| SyncError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(SyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        SyncError::Configuration(format!("Invalid value '{value}' for {key}"))
    })
}

/// Applies environment variable overrides using the `GTFS_SYNC_` prefix
///
/// Variables follow the pattern `GTFS_SYNC_<SECTION>_<KEY>`, for example
/// `GTFS_SYNC_SOURCE_URL` or `GTFS_SYNC_IMPORT_BATCH_SIZE`.
fn apply_env_overrides(config: &mut SyncConfig) -> Result<()> {
    const PREFIX: &str = "GTFS_SYNC_";
    let var = |key: &str| std::env::var(format!("{PREFIX}{key}")).ok();

    // Application overrides
    if let Some(val) = var("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Source overrides
    if let Some(val) = var("SOURCE_URL") {
        config.source.url = val;
    }
    if let Some(val) = var("SOURCE_CONNECT_TIMEOUT_SECONDS") {
        config.source.connect_timeout_seconds =
            parse_override("GTFS_SYNC_SOURCE_CONNECT_TIMEOUT_SECONDS", &val)?;
    }
    if let Some(val) = var("SOURCE_STALL_TIMEOUT_SECONDS") {
        config.source.stall_timeout_seconds =
            parse_override("GTFS_SYNC_SOURCE_STALL_TIMEOUT_SECONDS", &val)?;
    }

    // Staging overrides
    if let Some(val) = var("STAGING_DIR") {
        config.staging.dir = val;
    }

    // Change detection overrides
    if let Some(val) = var("CHANGE_DETECTION_STRATEGY") {
        config.change_detection.strategy = match val.to_lowercase().as_str() {
            "sha256" => ChangeStrategy::Sha256,
            "size" => ChangeStrategy::Size,
            _ => {
                return Err(SyncError::Configuration(format!(
                    "Invalid value '{val}' for GTFS_SYNC_CHANGE_DETECTION_STRATEGY. Must be one of: sha256, size"
                )))
            }
        };
    }

    // Import overrides
    if let Some(val) = var("IMPORT_BATCH_SIZE") {
        config.import.batch_size = parse_override("GTFS_SYNC_IMPORT_BATCH_SIZE", &val)?;
    }
    if let Some(val) = var("IMPORT_PARALLEL_PARSE") {
        config.import.parallel_parse = parse_override("GTFS_SYNC_IMPORT_PARALLEL_PARSE", &val)?;
    }

    // Store overrides
    if let Some(val) = var("STORE_PATH") {
        config.store.path = val;
    }

    // Logging overrides
    if let Some(val) = var("LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("GTFS_SYNC_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = var("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
