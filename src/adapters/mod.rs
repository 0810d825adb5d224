//! External system integrations for gtfs-sync.
//!
//! - [`source`] - where the archive comes from (HTTP or local file)
//! - [`store`] - the transactional destination store (SQLite or in-memory)
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the pipeline can be
//! tested against in-memory implementations.
//!
//! ```rust,no_run
//! use gtfs_sync::adapters::store::{DestinationStore, SqliteStore};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("bus_schedule.db", Duration::from_secs(5))?;
//! println!("{} stops", store.row_count("stops")?);
//! # Ok(())
//! # }
//! ```

pub mod source;
pub mod store;
