//! Table import
//!
//! - [`mapping`] - header-driven column mapping with a published-order fallback
//! - [`batch`] - row batching and per-table statistics
//! - [`importer`] - the transactional multi-table import

pub mod batch;
pub mod importer;
pub mod mapping;

pub use batch::{ImportReport, RowBatch, TableImportStats};
pub use importer::TableImporter;
pub use mapping::ColumnMap;
