//! Destination store boundary
//!
//! The pipeline writes through [`DestinationStore`]. Transactions are held by a
//! [`TransactionScope`] guard that rolls back on every exit path except an
//! explicit [`TransactionScope::commit`]. Flags and settings are written
//! outside any import transaction so their values survive a rollback.

use crate::domain::tables::TableSpec;
use crate::domain::StoreError;

/// One destination row in the table's insert order; `None` binds NULL
pub type Row = Vec<Option<String>>;

/// Durable flag and setting keys
pub mod keys {
    /// True once a full import committed
    pub const IMPORT_COMPLETE: &str = "import_complete";
    /// Hex digest of the imported archive
    pub const ARCHIVE_SHA256: &str = "archive_sha256";
    /// Byte size of the imported archive
    pub const ARCHIVE_SIZE: &str = "archive_size";
    /// RFC 3339 time of the last committed import
    pub const IMPORTED_AT: &str = "imported_at";
    /// Source URL chosen at runtime
    pub const SOURCE_URL: &str = "gtfs_url";
}

/// Transactional relational store the pipeline populates
pub trait DestinationStore: Send {
    /// Start the import transaction
    fn begin_transaction(&mut self) -> Result<(), StoreError>;

    /// Make every write since `begin_transaction` visible
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard every write since `begin_transaction`
    fn rollback(&mut self) -> Result<(), StoreError>;

    fn in_transaction(&self) -> bool;

    /// Insert rows with replace-on-conflict semantics, returning rows written
    ///
    /// Each row must hold exactly one value per column of `table`.
    fn bulk_insert(&mut self, table: &TableSpec, rows: &[Row]) -> Result<usize, StoreError>;

    fn read_flag(&self, key: &str) -> Result<Option<bool>, StoreError>;

    /// Persist a flag; refused while a transaction is open
    fn write_flag(&mut self, key: &str, value: bool) -> Result<(), StoreError>;

    fn read_setting(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Persist a setting; refused while a transaction is open
    fn write_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Committed rows in a catalogue table
    fn row_count(&self, table: &str) -> Result<u64, StoreError>;
}

/// Produces store handles for one destination
pub trait StoreOpener: Send + Sync {
    fn open(&self) -> Result<Box<dyn DestinationStore>, StoreError>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Scoped import transaction
///
/// # Examples
///
/// ```
/// use gtfs_sync::adapters::store::{DestinationStore, MemoryStore, TransactionScope};
/// use gtfs_sync::domain::tables::AGENCY;
///
/// let mut store = MemoryStore::new();
/// {
///     let mut scope = TransactionScope::begin(&mut store).unwrap();
///     let row = vec![
///         Some("RTD".to_string()),
///         Some("Regional Transportation District".to_string()),
///         Some("https://www.rtd-denver.com".to_string()),
///         Some("America/Denver".to_string()),
///         None,
///     ];
///     scope.bulk_insert(&AGENCY, &[row]).unwrap();
///     // dropped without commit
/// }
/// assert_eq!(store.row_count("agency").unwrap(), 0);
/// ```
pub struct TransactionScope<'a, S: DestinationStore + ?Sized> {
    store: &'a mut S,
    finished: bool,
}

impl<'a, S: DestinationStore + ?Sized> TransactionScope<'a, S> {
    pub fn begin(store: &'a mut S) -> Result<Self, StoreError> {
        store.begin_transaction()?;
        Ok(Self {
            store,
            finished: false,
        })
    }

    pub fn bulk_insert(&mut self, table: &TableSpec, rows: &[Row]) -> Result<usize, StoreError> {
        self.store.bulk_insert(table, rows)
    }

    /// Commit; on failure the guard still rolls back when dropped
    pub fn commit(mut self) -> Result<(), StoreError> {
        self.store.commit()?;
        self.finished = true;
        Ok(())
    }

    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.finished = true;
        self.store.rollback()
    }
}

impl<S: DestinationStore + ?Sized> Drop for TransactionScope<'_, S> {
    fn drop(&mut self) {
        if self.finished || !self.store.in_transaction() {
            return;
        }
        if let Err(e) = self.store.rollback() {
            tracing::error!(error = %e, "Failed to roll back import transaction");
        } else {
            tracing::warn!("Import transaction rolled back");
        }
    }
}
