//! Core refresh pipeline for gtfs-sync.
//!
//! # Modules
//!
//! - [`fetch`] - Streams the archive to the staging directory
//! - [`compare`] - Decides whether the downloaded archive needs importing
//! - [`extract`] - Unpacks the table files the store knows about
//! - [`import`] - Transactional, batched import of staged tables
//! - [`update`] - Stage machine tying the four together
//! - [`progress`] - Monotonic percent aggregation across stages
//! - [`retry`] - Bounded exponential backoff
//!
//! # Update Workflow
//!
//! 1. **Download**: fetch the archive, hashing it as it streams
//! 2. **Compare**: skip the rest when digest (or size) matches the last import
//! 3. **Extract**: stage known table files, fail when a required one is absent
//! 4. **Import**: replace table contents inside one transaction
//! 5. **Record**: persist the archive digest and set the import-complete flag
//!
//! # Example
//!
//! ```rust,no_run
//! use gtfs_sync::config::load_config;
//! use gtfs_sync::core::update::UpdateCoordinator;
//! use gtfs_sync::domain::UpdateMode;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("gtfs-sync.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let coordinator = UpdateCoordinator::from_config(config, shutdown_rx)?;
//!
//! let summary = coordinator.run(None, UpdateMode::Check).await?;
//! println!("{}", summary.stage);
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod extract;
pub mod fetch;
pub mod import;
pub mod progress;
pub mod retry;
pub mod update;
