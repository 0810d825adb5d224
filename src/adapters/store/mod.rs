//! Destination store adapters
//!
//! [`SqliteStore`] is the production store; [`MemoryStore`] backs dry runs
//! and tests.

pub mod memory;
pub mod query;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryStore;
pub use query::{search_stops, stop_schedule, ScheduledArrival, StopMatch};
pub use sqlite::{SqliteStore, SqliteStoreOpener};
pub use traits::{keys, DestinationStore, Row, StoreOpener, TransactionScope};
