//! Configuration management for gtfs-sync.
//!
//! gtfs-sync uses a TOML configuration file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `GTFS_SYNC_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! url = "https://www.rtd-denver.com/files/gtfs/google_transit.zip"
//! stall_timeout_seconds = 60
//!
//! [change_detection]
//! strategy = "sha256"
//!
//! [import]
//! batch_size = 1000
//!
//! [store]
//! path = "${GTFS_SYNC_DATA}/bus_schedule.db"
//!
//! [logging.groups]
//! import_verbose = true
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use gtfs_sync::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("gtfs-sync.toml")?;
//! println!("Source: {}", config.source.url);
//! println!("Batch size: {}", config.import.batch_size);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, ChangeDetectionConfig, ChangeStrategy, ImportConfig, LogGroupsConfig,
    LoggingConfig, RetryConfig, SourceConfig, StagingConfig, StoreConfig, SyncConfig,
    DEFAULT_SOURCE_URL,
};
