//! Update run summary and reporting

use crate::core::import::{ImportReport, TableImportStats};
use crate::domain::{ArchiveHandle, UpdateMode, UpdateStage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of one update run
#[derive(Debug, Clone, Serialize)]
pub struct UpdateSummary {
    /// Identifier tagging every log line of the run
    pub run_id: Uuid,

    pub mode: UpdateMode,

    /// Source URL the run resolved to
    pub url: Option<String>,

    /// Terminal stage reached
    pub stage: UpdateStage,

    /// Digest of the downloaded archive
    pub archive_sha256: Option<String>,

    /// Size of the downloaded archive in bytes
    pub archive_bytes: Option<u64>,

    /// Per-table counts of a committed import
    pub tables: BTreeMap<String, TableImportStats>,

    pub started_at: DateTime<Utc>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,

    /// Failure text, when the run did not succeed
    pub error: Option<String>,

    /// The failure was an unreachable source or store
    pub unreachable: bool,
}

impl UpdateSummary {
    /// Create a summary for a run starting now
    pub fn new(mode: UpdateMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            url: None,
            stage: UpdateStage::Idle,
            archive_sha256: None,
            archive_bytes: None,
            tables: BTreeMap::new(),
            started_at: Utc::now(),
            duration_ms: 0,
            error: None,
            unreachable: false,
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Record the downloaded archive
    pub fn set_archive(&mut self, handle: &ArchiveHandle) {
        self.archive_sha256 = handle.sha256.clone();
        self.archive_bytes = Some(handle.byte_len);
    }

    /// Record the committed import
    pub fn set_import(&mut self, report: ImportReport) {
        self.tables = report.tables;
    }

    /// Data imported or already current
    pub fn is_successful(&self) -> bool {
        self.stage.is_success()
    }

    pub fn total_inserted(&self) -> u64 {
        self.tables.values().map(|s| s.inserted).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.tables.values().map(|s| s.skipped).sum()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        if self.is_successful() {
            tracing::info!(
                run_id = %self.run_id,
                mode = ?self.mode,
                stage = ?self.stage,
                tables = self.tables.len(),
                rows_inserted = self.total_inserted(),
                rows_skipped = self.total_skipped(),
                duration_ms = self.duration_ms,
                "{}",
                self.stage.description()
            );
        } else {
            tracing::warn!(
                run_id = %self.run_id,
                mode = ?self.mode,
                stage = ?self.stage,
                duration_ms = self.duration_ms,
                error = self.error.as_deref().unwrap_or("unknown"),
                "{}",
                self.stage.description()
            );
        }

        for (table, stats) in &self.tables {
            if stats.skipped > 0 {
                tracing::warn!(
                    table = %table,
                    skipped = stats.skipped,
                    "Rows skipped during import"
                );
            }
        }
    }
}
