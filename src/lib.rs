// gtfs-sync - GTFS transit data refresh pipeline
// Copyright (c) 2025 gtfs-sync Contributors
// Licensed under the MIT License

//! # gtfs-sync - GTFS transit data refresh pipeline
//!
//! gtfs-sync keeps a local SQLite store in step with a transit agency's
//! published GTFS archive.
//!
//! ## Overview
//!
//! One update run:
//! - **Downloads** the archive over HTTP(S) or from a local path, hashing it
//!   as it streams
//! - **Compares** it with the archive behind the last committed import and
//!   stops early when nothing changed
//! - **Extracts** the table files the store knows about
//! - **Imports** every table inside a single transaction, so readers see
//!   either the previous data set or the new one
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - The refresh pipeline (fetch, compare, extract, import, update)
//! - [`adapters`] - Archive sources and destination stores
//! - [`domain`] - Core domain types, the table catalogue and error types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and log groups
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gtfs_sync::config::load_config;
//! use gtfs_sync::core::update::UpdateCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("gtfs-sync.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let coordinator = UpdateCoordinator::from_config(config, shutdown_rx)?;
//!
//!     let mut percent = coordinator.subscribe_percent();
//!     tokio::spawn(async move {
//!         while percent.changed().await.is_ok() {
//!             println!("{}%", *percent.borrow());
//!         }
//!     });
//!
//!     let imported = coordinator
//!         .start_update("https://www.rtd-denver.com/files/gtfs/google_transit.zip")
//!         .await;
//!     println!("update succeeded: {imported}");
//!     Ok(())
//! }
//! ```
//!
//! ## Import guarantees
//!
//! The `import_complete` flag is cleared before the import transaction opens
//! and set only after it commits. A reader that finds it false knows the
//! store holds a failed or interrupted import.
//!
//! ```rust
//! use gtfs_sync::adapters::store::{keys, DestinationStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! assert_eq!(store.read_flag(keys::IMPORT_COMPLETE).unwrap(), None);
//! ```
//!
//! ## Error Handling
//!
//! Each pipeline stage has its own error enum, all convertible into
//! [`domain::UpdateError`]. Configuration and I/O use [`domain::SyncError`]:
//!
//! ```rust,no_run
//! use gtfs_sync::domain::SyncError;
//!
//! fn example() -> Result<(), SyncError> {
//!     let config = gtfs_sync::config::load_config("gtfs-sync.toml")?;
//!     println!("{}", config.store.path);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
