//! Logging and observability
//!
//! This module provides:
//! - Structured console and JSON file logging via `tracing`
//! - Group-gated pipeline diagnostics injected into each component
//! - Macros for recurring pipeline events
//!
//! # Example
//!
//! ```no_run
//! use gtfs_sync::logging::init_logging;
//! use gtfs_sync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod groups;
pub mod structured;

pub use groups::{GroupLogger, LogEntry, LogGroup, LogGroups, LogSink, MemoryLogSink};
pub use structured::{init_logging, LoggingGuard};

/// Log a stage transition of the update state machine
///
/// # Example
///
/// ```no_run
/// use gtfs_sync::log_stage_transition;
/// use gtfs_sync::domain::UpdateStage;
///
/// log_stage_transition!(UpdateStage::Downloading, UpdateStage::Comparing);
/// ```
#[macro_export]
macro_rules! log_stage_transition {
    ($from:expr, $to:expr) => {
        tracing::info!(
            from = ?$from,
            to = ?$to,
            "Update stage changed"
        );
    };
}

/// Log a bulk insert flush
///
/// # Example
///
/// ```no_run
/// use gtfs_sync::log_batch_flush;
///
/// log_batch_flush!("stops", 1000, 3000);
/// ```
#[macro_export]
macro_rules! log_batch_flush {
    ($table:expr, $rows:expr, $total:expr) => {
        tracing::debug!(
            table = %$table,
            rows = $rows,
            total_rows = $total,
            "Flushed batch"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use gtfs_sync::log_retry_attempt;
///
/// log_retry_attempt!(2, 5, 200, "database is locked");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $delay_ms:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            delay_ms = $delay_ms,
            reason = %$reason,
            "Retrying operation with exponential backoff"
        );
    };
}
