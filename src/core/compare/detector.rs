//! Change detection between the fetched archive and the last import

use super::checksum::sha256_file;
use crate::adapters::store::{keys, DestinationStore};
use crate::config::ChangeStrategy;
use crate::domain::{ArchiveHandle, ArchiveRecord, ComparisonError};
use crate::logging::{GroupLogger, LogGroup};
use chrono::{DateTime, Utc};

/// Decides whether a fetched archive needs importing
///
/// Comparison never touches the store. Persisting the new archive record is
/// the separate [`ChangeDetector::record_import`] step, run only after the
/// import committed.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    strategy: ChangeStrategy,
    logger: GroupLogger,
}

impl ChangeDetector {
    pub fn new(strategy: ChangeStrategy, logger: GroupLogger) -> Self {
        Self { strategy, logger }
    }

    pub fn strategy(&self) -> ChangeStrategy {
        self.strategy
    }

    /// Whether `handle` differs from the archive behind `previous`
    ///
    /// No previous record, or a record lacking the compared field, means an
    /// update is needed.
    pub fn is_update_needed(
        &self,
        handle: &ArchiveHandle,
        previous: Option<&ArchiveRecord>,
    ) -> Result<bool, ComparisonError> {
        let needed = match self.strategy {
            ChangeStrategy::Sha256 => {
                let Some(previous_digest) = previous.and_then(|r| r.sha256.as_deref()) else {
                    self.logger
                        .log(LogGroup::CompareSimple, "No previous digest, update needed");
                    return Ok(true);
                };
                let digest = match &handle.sha256 {
                    Some(digest) => digest.clone(),
                    None => sha256_file(&handle.path)?,
                };
                self.logger.log_with(LogGroup::CompareSimple, || {
                    format!("Comparing digest {digest} with previous {previous_digest}")
                });
                !digest.eq_ignore_ascii_case(previous_digest)
            }
            ChangeStrategy::Size => {
                let Some(previous_len) = previous.and_then(|r| r.byte_len) else {
                    self.logger
                        .log(LogGroup::CompareSimple, "No previous size, update needed");
                    return Ok(true);
                };
                self.logger.log_with(LogGroup::CompareSimple, || {
                    format!(
                        "Comparing size {} with previous {previous_len}",
                        handle.byte_len
                    )
                });
                handle.byte_len != previous_len
            }
        };

        self.logger.log(
            LogGroup::CompareSimple,
            if needed {
                "Archive changed, update needed"
            } else {
                "Archive unchanged"
            },
        );
        Ok(needed)
    }

    /// Read-only variant that treats any comparison failure as "update needed"
    pub fn is_update_needed_lenient(
        &self,
        handle: &ArchiveHandle,
        previous: Option<&ArchiveRecord>,
    ) -> bool {
        self.is_update_needed(handle, previous).unwrap_or_else(|e| {
            self.logger
                .log(LogGroup::Error, format!("Change detection failed: {e}"));
            true
        })
    }

    /// Pre-download check of the remote's declared size
    ///
    /// Returns false only when both sizes are known and equal.
    pub fn remote_size_differs(
        &self,
        remote_size: Option<u64>,
        previous: Option<&ArchiveRecord>,
    ) -> bool {
        match (remote_size, previous.and_then(|r| r.byte_len)) {
            (Some(remote), Some(stored)) => {
                self.logger.log_with(LogGroup::CompareSimple, || {
                    format!("Remote size {remote}, imported size {stored}")
                });
                remote != stored
            }
            _ => true,
        }
    }

    /// The last recorded archive, whatever the import flag says
    pub fn load_record(
        store: &dyn DestinationStore,
    ) -> Result<Option<ArchiveRecord>, ComparisonError> {
        let sha256 = store.read_setting(keys::ARCHIVE_SHA256)?;
        let byte_len = store
            .read_setting(keys::ARCHIVE_SIZE)?
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ComparisonError::InvalidRecord {
                        key: keys::ARCHIVE_SIZE.to_string(),
                        value: raw.clone(),
                    })
            })
            .transpose()?;
        let imported_at = store
            .read_setting(keys::IMPORTED_AT)?
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw.trim())
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(|_| ComparisonError::InvalidRecord {
                        key: keys::IMPORTED_AT.to_string(),
                        value: raw.clone(),
                    })
            })
            .transpose()?;

        let record = ArchiveRecord {
            sha256,
            byte_len,
            imported_at,
        };
        Ok((!record.is_empty()).then_some(record))
    }

    /// The record behind the data the store currently vouches for
    ///
    /// Returns `None` unless the import-complete flag is set, so a store left
    /// behind by a failed or interrupted import is always re-imported.
    pub fn load_committed_record(
        store: &dyn DestinationStore,
    ) -> Result<Option<ArchiveRecord>, ComparisonError> {
        if store.read_flag(keys::IMPORT_COMPLETE)? != Some(true) {
            return Ok(None);
        }
        Self::load_record(store)
    }

    /// Persist the digest, size and time of a committed import
    pub fn record_import(
        &self,
        store: &mut dyn DestinationStore,
        handle: &ArchiveHandle,
    ) -> Result<ArchiveRecord, ComparisonError> {
        let digest = match &handle.sha256 {
            Some(digest) => digest.clone(),
            None => sha256_file(&handle.path)?,
        };
        let imported_at = Utc::now();

        store.write_setting(keys::ARCHIVE_SHA256, &digest)?;
        store.write_setting(keys::ARCHIVE_SIZE, &handle.byte_len.to_string())?;
        store.write_setting(keys::IMPORTED_AT, &imported_at.to_rfc3339())?;

        self.logger.log(
            LogGroup::CompareSimple,
            format!("Recorded archive {digest} ({} bytes)", handle.byte_len),
        );
        Ok(ArchiveRecord {
            sha256: Some(digest),
            byte_len: Some(handle.byte_len),
            imported_at: Some(imported_at),
        })
    }
}
