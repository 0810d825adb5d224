//! Configuration schema types
//!
//! Every section has defaults, so a file only needs the keys it changes.

use crate::domain::tables::{table_spec, DEFAULT_REQUIRED_TABLES};
use serde::{Deserialize, Serialize};

/// Publisher URL used when neither the CLI nor the store names one
pub const DEFAULT_SOURCE_URL: &str = "https://www.rtd-denver.com/files/gtfs/google_transit.zip";

/// Largest batch the SQLite bind-parameter limit allows for the widest table
const MAX_BATCH_SIZE: usize = 2000;

/// Main gtfs-sync configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Archive source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Staging directory settings
    #[serde(default)]
    pub staging: StagingConfig,

    /// Change detection settings
    #[serde(default)]
    pub change_detection: ChangeDetectionConfig,

    /// Table import settings
    #[serde(default)]
    pub import: ImportConfig,

    /// Destination store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SyncConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.source.validate()?;
        self.staging.validate()?;
        self.import.validate()?;
        self.store.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Archive source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Default archive URL (http, https or file)
    #[serde(default = "default_source_url")]
    pub url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// Seconds without a received chunk before a download is abandoned
    #[serde(default = "default_stall_timeout_seconds")]
    pub stall_timeout_seconds: u64,

    /// User-Agent header sent with HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl SourceConfig {
    fn validate(&self) -> Result<(), String> {
        validate_source_url(&self.url)?;
        if self.connect_timeout_seconds == 0 {
            return Err("source.connect_timeout_seconds must be > 0".to_string());
        }
        if self.stall_timeout_seconds == 0 {
            return Err("source.stall_timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            stall_timeout_seconds: default_stall_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

/// Checks that a source URL parses and uses a supported scheme
pub fn validate_source_url(raw: &str) -> Result<(), String> {
    let parsed =
        url::Url::parse(raw).map_err(|e| format!("Invalid source url '{raw}': {e}"))?;
    match parsed.scheme() {
        "http" | "https" | "file" => Ok(()),
        other => Err(format!(
            "Unsupported source url scheme '{other}'. Must be one of: http, https, file"
        )),
    }
}

/// Staging directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Directory holding the archive and extracted files
    #[serde(default = "default_staging_dir")]
    pub dir: String,

    /// File name of the downloaded archive
    #[serde(default = "default_archive_name")]
    pub archive_name: String,

    /// Remove extracted files after a run ends
    #[serde(default = "default_true")]
    pub discard_after_import: bool,
}

impl StagingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.dir.trim().is_empty() {
            return Err("staging.dir cannot be empty".to_string());
        }
        if self.archive_name.trim().is_empty() || self.archive_name.contains(['/', '\\']) {
            return Err(format!(
                "staging.archive_name '{}' must be a plain file name",
                self.archive_name
            ));
        }
        Ok(())
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: default_staging_dir(),
            archive_name: default_archive_name(),
            discard_after_import: true,
        }
    }
}

/// How the previous archive is compared with the new one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStrategy {
    /// Compare SHA-256 digests of the archive
    #[default]
    Sha256,
    /// Compare archive sizes
    Size,
}

/// Change detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChangeDetectionConfig {
    /// Comparison used after download
    #[serde(default)]
    pub strategy: ChangeStrategy,

    /// Ask the remote for its size before downloading and stop early on a match
    #[serde(default)]
    pub size_precheck: bool,
}

/// Table import configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Rows per bulk insert
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Parse staged files on worker threads while one writer inserts
    #[serde(default = "default_true")]
    pub parallel_parse: bool,

    /// Tables the archive must contain
    #[serde(default = "default_required_tables")]
    pub required_tables: Vec<String>,
}

impl ImportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(format!(
                "import.batch_size must be between 1 and {MAX_BATCH_SIZE}"
            ));
        }
        if self.required_tables.is_empty() {
            return Err("import.required_tables cannot be empty".to_string());
        }
        for table in &self.required_tables {
            if table_spec(table).is_none() {
                return Err(format!("import.required_tables names unknown table '{table}'"));
            }
        }
        Ok(())
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            parallel_parse: true,
            required_tables: default_required_tables(),
        }
    }
}

/// Retry configuration for store acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor between delays
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err("store.retry.max_attempts must be between 1 and 10".to_string());
        }
        if self.backoff_multiplier < 1.0 {
            return Err("store.retry.backoff_multiplier must be >= 1.0".to_string());
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err("store.retry.max_delay_ms must be >= initial_delay_ms".to_string());
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Destination store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    #[serde(default = "default_store_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Retry policy for opening the store
    #[serde(default)]
    pub retry: RetryConfig,
}

impl StoreConfig {
    fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("store.path cannot be empty".to_string());
        }
        self.retry.validate()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

/// Per-group switches for pipeline diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogGroupsConfig {
    #[serde(default = "default_true")]
    pub import_simple: bool,
    #[serde(default)]
    pub import_verbose: bool,
    #[serde(default = "default_true")]
    pub download_simple: bool,
    #[serde(default = "default_true")]
    pub extractor_simple: bool,
    #[serde(default = "default_true")]
    pub compare_simple: bool,
    #[serde(default = "default_true")]
    pub query_simple: bool,
    #[serde(default)]
    pub query_verbose: bool,
    #[serde(default = "default_true")]
    pub error: bool,
}

impl Default for LogGroupsConfig {
    fn default() -> Self {
        Self {
            import_simple: true,
            import_verbose: false,
            download_simple: true,
            extractor_simple: true,
            compare_simple: true,
            query_simple: true,
            query_verbose: false,
            error: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Enabled diagnostic groups
    #[serde(default)]
    pub groups: LogGroupsConfig,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            groups: LogGroupsConfig::default(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_connect_timeout_seconds() -> u64 {
    30
}

fn default_stall_timeout_seconds() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("gtfs-sync/{}", env!("CARGO_PKG_VERSION"))
}

fn default_staging_dir() -> String {
    "gtfs_data".to_string()
}

fn default_archive_name() -> String {
    "google_transit.zip".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_required_tables() -> Vec<String> {
    DEFAULT_REQUIRED_TABLES.iter().map(|t| t.to_string()).collect()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    2000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_store_path() -> String {
    "bus_schedule.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.source.url, DEFAULT_SOURCE_URL);
        assert_eq!(config.import.batch_size, 1000);
        assert_eq!(config.change_detection.strategy, ChangeStrategy::Sha256);
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_url_validation() {
        assert!(validate_source_url("https://example.com/feed.zip").is_ok());
        assert!(validate_source_url("file:///var/lib/gtfs/feed.zip").is_ok());
        assert!(validate_source_url("ftp://example.com/feed.zip").is_err());
        assert!(validate_source_url("not a url").is_err());
    }

    #[test]
    fn test_import_config_validation() {
        let mut config = ImportConfig::default();
        assert!(config.validate().is_ok());

        config.batch_size = 0;
        assert!(config.validate().is_err());

        config.batch_size = MAX_BATCH_SIZE + 1;
        assert!(config.validate().is_err());

        config.batch_size = 500;
        config.required_tables = vec!["stops".to_string(), "fares".to_string()];
        assert!(config.validate().is_err());

        config.required_tables.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_config_validation() {
        let mut config = RetryConfig::default();
        assert!(config.validate().is_ok());

        config.max_attempts = 0;
        assert!(config.validate().is_err());

        config.max_attempts = 3;
        config.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        config.backoff_multiplier = 2.0;
        config.max_delay_ms = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_staging_archive_name_must_be_plain() {
        let config = StagingConfig {
            archive_name: "../escape.zip".to_string(),
            ..StagingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.local_enabled);
        assert_eq!(config.local_rotation, "daily");
        assert!(config.groups.import_simple);
        assert!(!config.groups.import_verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strategy_parses_lowercase() {
        let config: ChangeDetectionConfig =
            toml::from_str("strategy = \"size\"\nsize_precheck = true").unwrap();
        assert_eq!(config.strategy, ChangeStrategy::Size);
        assert!(config.size_precheck);
    }
}
