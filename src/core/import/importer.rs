//! Transactional import of staged table files
//!
//! Every staged table is parsed, remapped and bulk-inserted inside one
//! transaction. With parallel parsing each table is read on its own scoped
//! thread and parsed batches flow over a bounded channel to the calling
//! thread, which is the only writer and owns the transaction.

use super::batch::{ImportReport, RowBatch};
use super::mapping::ColumnMap;
use crate::adapters::store::{keys, DestinationStore, Row, TransactionScope};
use crate::config::ImportConfig;
use crate::core::progress::StageProgress;
use crate::domain::tables::TABLES;
use crate::domain::{ImportError, StagedFileSet, TableSpec};
use crate::log_batch_flush;
use crate::logging::{GroupLogger, LogGroup};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver};
use tokio::sync::watch;

/// A staged table scheduled for import
#[derive(Debug, Clone)]
struct ImportJob {
    spec: &'static TableSpec,
    path: PathBuf,
    bytes: u64,
}

/// Rows parsed from one table plus the source bytes they consumed
#[derive(Debug)]
struct ParsedBatch {
    table: &'static TableSpec,
    rows: Vec<Row>,
    bytes: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ParseOutcome {
    skipped: u64,
}

enum WorkerMessage {
    Batch(ParsedBatch),
    Done {
        table: &'static TableSpec,
        result: Result<ParseOutcome, ImportError>,
    },
}

/// Imports a [`StagedFileSet`] into a destination store
///
/// The import-complete flag is cleared before the transaction opens and set
/// only after it commits. A failed import leaves it cleared; a cancelled one
/// restores its earlier value, since the rollback left the earlier data in
/// place.
#[derive(Debug, Clone)]
pub struct TableImporter {
    batch_size: usize,
    parallel_parse: bool,
    logger: GroupLogger,
}

impl TableImporter {
    pub fn new(config: &ImportConfig, logger: GroupLogger) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            parallel_parse: config.parallel_parse,
            logger,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_parallel_parse(mut self, parallel_parse: bool) -> Self {
        self.parallel_parse = parallel_parse;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Import every staged table in one transaction
    ///
    /// Blocking; run it off the async executor.
    pub fn import_all(
        &self,
        store: &mut dyn DestinationStore,
        staged: &StagedFileSet,
        progress: &StageProgress,
        cancel: &watch::Receiver<bool>,
    ) -> Result<ImportReport, ImportError> {
        let jobs = plan(staged)?;
        let total_bytes = jobs.iter().map(|job| job.bytes).sum();

        if *cancel.borrow() {
            return Err(ImportError::Cancelled);
        }

        let prior = store
            .read_flag(keys::IMPORT_COMPLETE)
            .map_err(ImportError::Transaction)?;
        store
            .write_flag(keys::IMPORT_COMPLETE, false)
            .map_err(ImportError::Transaction)?;

        self.logger.log(
            LogGroup::ImportSimple,
            format!(
                "Importing {} tables ({} bytes, batch size {}, {})",
                jobs.len(),
                total_bytes,
                self.batch_size,
                if self.parallel_parse { "parallel parse" } else { "sequential parse" }
            ),
        );

        let outcome = self.import_in_transaction(store, &jobs, progress, cancel, total_bytes);

        match outcome {
            Ok(report) => {
                store
                    .write_flag(keys::IMPORT_COMPLETE, true)
                    .map_err(ImportError::Transaction)?;
                progress.report(100);
                progress.set_table(None);
                self.logger.log(
                    LogGroup::ImportSimple,
                    format!(
                        "Import committed: {} rows, {} skipped",
                        report.total_inserted(),
                        report.total_skipped()
                    ),
                );
                Ok(report)
            }
            Err(ImportError::Cancelled) => {
                if let Err(e) = store.write_flag(keys::IMPORT_COMPLETE, prior.unwrap_or(false)) {
                    tracing::error!(error = %e, "Failed to restore import flag after cancellation");
                }
                self.logger
                    .log(LogGroup::ImportSimple, "Import cancelled and rolled back");
                Err(ImportError::Cancelled)
            }
            Err(e) => {
                self.logger
                    .log(LogGroup::Error, format!("Import rolled back: {e}"));
                Err(e)
            }
        }
    }

    fn import_in_transaction<S: DestinationStore + ?Sized>(
        &self,
        store: &mut S,
        jobs: &[ImportJob],
        progress: &StageProgress,
        cancel: &watch::Receiver<bool>,
        total_bytes: u64,
    ) -> Result<ImportReport, ImportError> {
        let scope = TransactionScope::begin(store).map_err(ImportError::Transaction)?;
        let mut sink = BatchSink {
            scope,
            report: ImportReport::new(),
            progress,
            cancel,
            bytes_done: 0,
            total_bytes,
            logger: &self.logger,
        };

        let parsed = if self.parallel_parse && jobs.len() > 1 {
            self.run_parallel(jobs, &mut sink)
        } else {
            self.run_sequential(jobs, &mut sink)
        };
        let result = parsed.and_then(|()| sink.check_cancelled());

        let BatchSink { scope, report, .. } = sink;
        match result {
            Ok(()) => {
                scope.commit().map_err(ImportError::Transaction)?;
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback_error) = scope.rollback() {
                    tracing::error!(error = %rollback_error, "Rollback after failed import failed");
                }
                Err(e)
            }
        }
    }

    fn run_sequential<S: DestinationStore + ?Sized>(
        &self,
        jobs: &[ImportJob],
        sink: &mut BatchSink<'_, S>,
    ) -> Result<(), ImportError> {
        for job in jobs {
            sink.check_cancelled()?;
            sink.progress.set_table(Some(job.spec.name));
            let outcome = parse_table(job.spec, &job.path, self.batch_size, &self.logger, |batch| {
                sink.write(batch)
            })?;
            sink.finish_table(job.spec, outcome);
        }
        Ok(())
    }

    fn run_parallel<S: DestinationStore + ?Sized>(
        &self,
        jobs: &[ImportJob],
        sink: &mut BatchSink<'_, S>,
    ) -> Result<(), ImportError> {
        std::thread::scope(|threads| {
            let (tx, rx) = sync_channel::<WorkerMessage>(jobs.len() * 2);
            let mut handles = Vec::with_capacity(jobs.len());

            for job in jobs {
                let tx = tx.clone();
                let logger = self.logger.clone();
                let batch_size = self.batch_size;
                let handle = std::thread::Builder::new()
                    .name(format!("parse-{}", job.spec.name))
                    .spawn_scoped(threads, move || {
                        let result = parse_table(job.spec, &job.path, batch_size, &logger, |batch| {
                            tx.send(WorkerMessage::Batch(batch))
                                .map_err(|_| ImportError::Worker {
                                    table: job.spec.name.to_string(),
                                })
                        });
                        // the writer may already have stopped listening
                        let _ = tx.send(WorkerMessage::Done {
                            table: job.spec,
                            result,
                        });
                    })
                    .map_err(|_| ImportError::Worker {
                        table: job.spec.name.to_string(),
                    })?;
                handles.push((job.spec, handle));
            }
            drop(tx);

            let mut pending: BTreeSet<&'static str> = jobs.iter().map(|job| job.spec.name).collect();
            // dropping the receiver unblocks workers before they are joined
            let drained = drain(rx, sink, &mut pending);

            let mut panicked = None;
            for (spec, handle) in handles {
                if handle.join().is_err() {
                    tracing::error!(table = %spec.name, "Parse worker panicked");
                    panicked.get_or_insert(spec.name);
                }
            }

            drained?;
            if let Some(table) = panicked.or_else(|| pending.iter().next().copied()) {
                return Err(ImportError::Worker {
                    table: table.to_string(),
                });
            }
            Ok(())
        })
    }
}

fn drain<S: DestinationStore + ?Sized>(
    rx: Receiver<WorkerMessage>,
    sink: &mut BatchSink<'_, S>,
    pending: &mut BTreeSet<&'static str>,
) -> Result<(), ImportError> {
    for message in rx {
        match message {
            WorkerMessage::Batch(batch) => sink.write(batch)?,
            WorkerMessage::Done { table, result } => {
                sink.finish_table(table, result?);
                pending.remove(table.name);
            }
        }
    }
    Ok(())
}

/// Staged tables in catalogue order with their sizes
fn plan(staged: &StagedFileSet) -> Result<Vec<ImportJob>, ImportError> {
    TABLES
        .iter()
        .filter_map(|spec| staged.get(spec.name).map(|path| (*spec, path)))
        .map(|(spec, path)| {
            let bytes = std::fs::metadata(path)
                .map_err(|source| ImportError::Open {
                    path: path.to_path_buf(),
                    source,
                })?
                .len();
            Ok(ImportJob {
                spec,
                path: path.to_path_buf(),
                bytes,
            })
        })
        .collect()
}

/// The single writer: owns the transaction and aggregates progress
struct BatchSink<'a, S: DestinationStore + ?Sized> {
    scope: TransactionScope<'a, S>,
    report: ImportReport,
    progress: &'a StageProgress,
    cancel: &'a watch::Receiver<bool>,
    bytes_done: u64,
    total_bytes: u64,
    logger: &'a GroupLogger,
}

impl<S: DestinationStore + ?Sized> BatchSink<'_, S> {
    fn check_cancelled(&self) -> Result<(), ImportError> {
        if *self.cancel.borrow() {
            Err(ImportError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn write(&mut self, batch: ParsedBatch) -> Result<(), ImportError> {
        self.check_cancelled()?;
        self.progress.set_table(Some(batch.table.name));

        let stats = self.report.table_mut(batch.table.name);
        if !batch.rows.is_empty() {
            let written = self
                .scope
                .bulk_insert(batch.table, &batch.rows)
                .map_err(|source| ImportError::Store {
                    table: batch.table.name.to_string(),
                    source,
                })?;
            stats.inserted += written as u64;
            stats.batches += 1;
            log_batch_flush!(batch.table.name, written, stats.inserted);
        }

        self.bytes_done += batch.bytes;
        self.progress
            .report_fraction(self.bytes_done, self.total_bytes);
        Ok(())
    }

    fn finish_table(&mut self, table: &'static TableSpec, outcome: ParseOutcome) {
        let stats = self.report.table_mut(table.name);
        stats.skipped += outcome.skipped;
        let stats = *stats;
        self.logger.log(
            LogGroup::ImportSimple,
            format!(
                "Imported {} rows into {} ({} skipped, {} batches)",
                stats.inserted, table.name, stats.skipped, stats.batches
            ),
        );
    }
}

/// Stream one staged file, emitting full batches and the final partial batch
fn parse_table<F>(
    spec: &'static TableSpec,
    path: &Path,
    batch_size: usize,
    logger: &GroupLogger,
    mut emit: F,
) -> Result<ParseOutcome, ImportError>
where
    F: FnMut(ParsedBatch) -> Result<(), ImportError>,
{
    let parse_error = |source| ImportError::Parse {
        table: spec.name.to_string(),
        source,
    };

    let file = File::open(path).map_err(|source| ImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(BufReader::new(file));

    let mut record = StringRecord::new();
    if !reader.read_record(&mut record).map_err(parse_error)? {
        logger.log(LogGroup::ImportSimple, format!("{} is empty", spec.file_name));
        return Ok(ParseOutcome::default());
    }

    let map = ColumnMap::from_header(spec, &record)?;
    if !map.is_header_driven() {
        logger.log(
            LogGroup::ImportSimple,
            format!("{} header not recognised, using published column order", spec.file_name),
        );
    }

    let mut batch = RowBatch::new(batch_size);
    let mut skipped = 0u64;
    let mut reported = 0u64;

    while reader.read_record(&mut record).map_err(parse_error)? {
        match map.remap(&record) {
            Some(row) => {
                if let Some(full) = batch.push(row) {
                    let position = reader.position().byte();
                    emit(ParsedBatch {
                        table: spec,
                        rows: full,
                        bytes: position.saturating_sub(reported),
                    })?;
                    reported = position;
                }
            }
            None => {
                skipped += 1;
                logger.log_with(LogGroup::ImportVerbose, || {
                    format!(
                        "Skipping {} line {}: {} fields, need {}",
                        spec.file_name,
                        record.position().map_or(0, |p| p.line()),
                        record.len(),
                        map.min_fields()
                    )
                });
            }
        }
    }

    let position = reader.position().byte();
    emit(ParsedBatch {
        table: spec,
        rows: batch.take_remaining(),
        bytes: position.saturating_sub(reported),
    })?;

    if skipped > 0 {
        logger.log(
            LogGroup::ImportSimple,
            format!("Skipped {skipped} short rows in {}", spec.file_name),
        );
    }
    Ok(ParseOutcome { skipped })
}
