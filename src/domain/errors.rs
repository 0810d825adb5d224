//! Domain error types
//!
//! Each pipeline stage has its own error enum so the coordinator can map a
//! failure onto the matching terminal stage. [`SyncError`] is the crate-wide
//! error used by configuration, logging and the CLI surface.

use std::path::PathBuf;
use thiserror::Error;

/// Main gtfs-sync error type
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Destination store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Update pipeline errors
    #[error("Update error: {0}")]
    Update(#[from] UpdateError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Errors raised while downloading the archive
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source URL could not be parsed or uses an unsupported scheme
    #[error("Invalid archive URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The remote answered with a non-success status
    #[error("HTTP {status} while fetching {url}")]
    Http { url: String, status: u16 },

    /// Connection, TLS or body read failure
    #[error("Network error while fetching {url}: {message}")]
    Network { url: String, message: String },

    /// No bytes arrived within the configured stall timeout
    #[error("Download from {url} stalled for {seconds}s")]
    Stalled { url: String, seconds: u64 },

    /// Writing or renaming the local archive failed
    #[error("Failed to write archive {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while deciding whether an update is needed
#[derive(Debug, Error)]
pub enum ComparisonError {
    /// The archive could not be read for hashing
    #[error("Failed to read archive {} for hashing: {source}", .path.display())]
    ReadArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The previous archive record could not be loaded
    #[error("Failed to read previous archive record: {0}")]
    Store(#[from] StoreError),

    /// A stored record value is not usable
    #[error("Stored archive record '{key}' has invalid value '{value}'")]
    InvalidRecord { key: String, value: String },
}

/// Errors raised while unpacking the archive
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The archive is unreadable: bad central directory, member header or stream
    #[error("Archive {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// A member could not be written to the staging directory
    #[error("Failed to stage {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive is readable but lacks required table files
    #[error("Archive is missing required files: {}", .missing.join(", "))]
    MissingMembers { missing: Vec<String> },
}

impl ExtractError {
    /// True when the archive itself could not be read
    pub fn is_corrupt(&self) -> bool {
        matches!(self, ExtractError::Corrupt { .. })
    }
}

/// Errors raised while importing staged tables
#[derive(Debug, Error)]
pub enum ImportError {
    /// A staged file could not be opened
    #[error("Failed to open staged file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The delimited reader failed on a staged file
    #[error("Failed to parse {table}: {source}")]
    Parse {
        table: String,
        #[source]
        source: csv::Error,
    },

    /// The header line lacks a column the table cannot do without
    #[error("Table {table} is missing required column {column}")]
    MissingColumn { table: String, column: String },

    /// A bulk insert was rejected by the store
    #[error("Failed to write {table}: {source}")]
    Store {
        table: String,
        #[source]
        source: StoreError,
    },

    /// Beginning, committing or rolling back the import transaction failed
    #[error("Import transaction failed: {0}")]
    Transaction(#[source] StoreError),

    /// A parse worker exited without reporting a result
    #[error("Parse worker for {table} stopped unexpectedly")]
    Worker { table: String },

    /// Cancellation was requested before commit
    #[error("Import cancelled before commit")]
    Cancelled,
}

/// Destination store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the database file failed
    #[error("Failed to open store {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The directory holding the database could not be created
    #[error("Failed to prepare store directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A statement failed
    #[error("SQLite error during {operation}: {source}")]
    Sqlite {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// The table has no descriptor in the catalogue
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// commit or rollback without a matching begin
    #[error("No transaction is active")]
    NoTransaction,

    /// begin while a transaction is already open
    #[error("A transaction is already active")]
    TransactionActive,

    /// The store refused a write
    #[error("Write to {table} rejected: {reason}")]
    Rejected { table: String, reason: String },

    /// Shared store state was poisoned by a panicking writer
    #[error("Store state lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// True when the failure is a lock held by another connection
    pub fn is_busy(&self) -> bool {
        let source = match self {
            StoreError::Open { source, .. } | StoreError::Sqlite { source, .. } => source,
            _ => return false,
        };
        matches!(
            source.sqlite_error_code(),
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
        )
    }
}

/// Errors surfaced by the update coordinator
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Another run holds the single-flight lock
    #[error("An update is already running")]
    AlreadyRunning,

    #[error("Download failed: {0}")]
    Download(#[from] FetchError),

    #[error("Change detection failed: {0}")]
    Comparison(#[from] ComparisonError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    /// Store acquisition failed after retries
    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),

    /// Cancellation was observed at a stage boundary
    #[error("Update cancelled")]
    Cancelled,

    /// A blocking task panicked or was aborted
    #[error("Background task failed: {0}")]
    Task(String),
}

impl UpdateError {
    /// True when the archive source or the store could not be reached
    pub fn is_unreachable(&self) -> bool {
        match self {
            UpdateError::Store(_) => true,
            UpdateError::Download(e) => matches!(
                e,
                FetchError::Http { .. } | FetchError::Network { .. } | FetchError::Stalled { .. }
            ),
            _ => false,
        }
    }

    /// True when the run stopped on a shutdown request
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            UpdateError::Cancelled | UpdateError::Import(ImportError::Cancelled)
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_missing_members_lists_files() {
        let err = ExtractError::MissingMembers {
            missing: vec!["stops.txt".to_string(), "trips.txt".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Archive is missing required files: stops.txt, trips.txt"
        );
        assert!(!err.is_corrupt());
    }

    #[test]
    fn test_corrupt_is_distinct_from_missing() {
        let err = ExtractError::Corrupt {
            path: PathBuf::from("feed.zip"),
            source: zip::result::ZipError::FileNotFound,
        };
        assert!(err.is_corrupt());
        assert!(err.to_string().contains("feed.zip"));
    }

    #[test]
    fn test_stage_errors_convert_into_update_error() {
        let fetch = FetchError::Http {
            url: "https://example.com/feed.zip".to_string(),
            status: 404,
        };
        assert!(matches!(UpdateError::from(fetch), UpdateError::Download(_)));

        let import = ImportError::Cancelled;
        assert!(matches!(UpdateError::from(import), UpdateError::Import(_)));
    }

    #[test]
    fn test_update_error_classification() {
        let stalled = UpdateError::from(FetchError::Stalled {
            url: "https://example.com/feed.zip".to_string(),
            seconds: 60,
        });
        assert!(stalled.is_unreachable());
        assert!(!stalled.is_cancelled());

        let invalid = UpdateError::from(FetchError::InvalidUrl {
            url: "ftp://example.com".to_string(),
            message: "unsupported scheme 'ftp'".to_string(),
        });
        assert!(!invalid.is_unreachable());

        assert!(UpdateError::Store(StoreError::NoTransaction).is_unreachable());
        assert!(UpdateError::from(ImportError::Cancelled).is_cancelled());
        assert!(UpdateError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_store_error_busy_detection() {
        let busy = StoreError::Sqlite {
            operation: "begin import transaction",
            source: rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                None,
            ),
        };
        assert!(busy.is_busy());
        assert!(!StoreError::NoTransaction.is_busy());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: SyncError = io_err.into();
        assert!(matches!(err, SyncError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: SyncError = toml_err.into();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
