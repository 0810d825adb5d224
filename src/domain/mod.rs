//! Domain models and types for gtfs-sync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Archive models** ([`ArchiveHandle`], [`ArchiveRecord`], [`StagedFileSet`])
//! - **The table catalogue** ([`TableSpec`], [`tables::TABLES`])
//! - **Update stages** ([`UpdateStage`], [`UpdateMode`])
//! - **Error types**, one per pipeline stage plus [`SyncError`]
//! - **Result type alias** ([`Result`])
//!
//! # Table catalogue
//!
//! ```rust
//! use gtfs_sync::domain::tables::{table_spec, STOPS};
//!
//! let spec = table_spec("stops").unwrap();
//! assert_eq!(spec, &STOPS);
//! assert_eq!(spec.column_names()[0], "stop_id");
//! ```

pub mod archive;
pub mod errors;
pub mod result;
pub mod stage;
pub mod tables;

pub use archive::{ArchiveHandle, ArchiveRecord, StagedFileSet};
pub use errors::{
    ComparisonError, ExtractError, FetchError, ImportError, StoreError, SyncError, UpdateError,
};
pub use result::Result;
pub use stage::{UpdateMode, UpdateStage};
pub use tables::{ColumnSpec, TableSpec};
