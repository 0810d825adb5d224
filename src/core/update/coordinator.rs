//! Update coordinator - main orchestrator for the refresh process
//!
//! This module drives one run through download, change detection,
//! extraction and import, publishing stage and percent as it goes.

use super::summary::UpdateSummary;
use crate::adapters::source::{ArchiveSource, SchemeRouter};
use crate::adapters::store::{keys, DestinationStore, SqliteStoreOpener, StoreOpener};
use crate::config::SyncConfig;
use crate::core::compare::ChangeDetector;
use crate::core::extract::Extractor;
use crate::core::fetch::Fetcher;
use crate::core::import::TableImporter;
use crate::core::progress::ProgressTracker;
use crate::core::retry::{retry, RetryPolicy};
use crate::domain::{StagedFileSet, UpdateError, UpdateMode, UpdateStage};
use crate::logging::{GroupLogger, LogGroup, LogGroups};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinError;

/// Update coordinator
///
/// Runs are single-flight: while one is in progress every other start is
/// rejected. The shutdown receiver doubles as the cancellation signal and is
/// checked at each stage boundary and before the import commits.
pub struct UpdateCoordinator {
    config: SyncConfig,
    source: Arc<dyn ArchiveSource>,
    opener: Arc<dyn StoreOpener>,
    logger: GroupLogger,
    progress: ProgressTracker,
    running: Mutex<()>,
    shutdown: watch::Receiver<bool>,
}

impl UpdateCoordinator {
    /// Create a coordinator over explicit source and store adapters
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn ArchiveSource>,
        opener: Arc<dyn StoreOpener>,
        logger: GroupLogger,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            source,
            opener,
            logger,
            progress: ProgressTracker::new(),
            running: Mutex::new(()),
            shutdown,
        }
    }

    /// Create a coordinator with the scheme-routed source and the SQLite store
    pub fn from_config(
        config: SyncConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, UpdateError> {
        let logger = GroupLogger::new(LogGroups::from_config(&config.logging.groups));
        let source: Arc<dyn ArchiveSource> = Arc::new(SchemeRouter::new(&config.source)?);
        let opener: Arc<dyn StoreOpener> = Arc::new(SqliteStoreOpener::new(
            &config.store.path,
            Duration::from_millis(config.store.busy_timeout_ms),
        ));
        Ok(Self::new(config, source, opener, logger, shutdown))
    }

    /// Run an update that imports only when the archive changed
    ///
    /// Returns true when the run ended in `Completed` or `NoUpdateNeeded`.
    pub async fn start_update(&self, url: &str) -> bool {
        self.run_to_bool(url, UpdateMode::Check).await
    }

    /// Run an update that skips change detection
    pub async fn force_update(&self, url: &str) -> bool {
        self.run_to_bool(url, UpdateMode::Force).await
    }

    async fn run_to_bool(&self, url: &str, mode: UpdateMode) -> bool {
        match self.run(Some(url), mode).await {
            Ok(summary) => summary.is_successful(),
            Err(e) => {
                tracing::warn!(error = %e, "Update not started");
                false
            }
        }
    }

    /// Execute one run
    ///
    /// `url` overrides the persisted source URL, which in turn overrides the
    /// configured default. Every started run returns a summary naming its
    /// terminal stage; only a rejected start is an error.
    pub async fn run(
        &self,
        url: Option<&str>,
        mode: UpdateMode,
    ) -> Result<UpdateSummary, UpdateError> {
        let _running = self.running.try_lock().map_err(|_| {
            tracing::warn!("Rejecting update start, a run is already in flight");
            UpdateError::AlreadyRunning
        })?;

        let started = Instant::now();
        let mut summary = UpdateSummary::new(mode);
        self.progress.reset();

        let terminal = match self.execute(url, mode, &mut summary).await {
            Ok(stage) => stage,
            Err(e) => {
                let stage = failure_stage(&e, self.progress.stage());
                self.logger
                    .log(LogGroup::Error, format!("{}: {e}", stage.description()));
                summary.error = Some(e.to_string());
                summary.unreachable = e.is_unreachable();
                stage
            }
        };

        self.progress.enter(terminal);
        summary.stage = terminal;
        let summary = summary.with_duration(started.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    /// True while a run holds the single-flight lock
    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    pub fn subscribe_stage(&self) -> watch::Receiver<UpdateStage> {
        self.progress.subscribe_stage()
    }

    pub fn subscribe_percent(&self) -> watch::Receiver<u8> {
        self.progress.subscribe_percent()
    }

    /// Table currently being written, `None` outside the import stage
    pub fn subscribe_table(&self) -> watch::Receiver<Option<String>> {
        self.progress.subscribe_table()
    }

    pub fn stage(&self) -> UpdateStage {
        self.progress.stage()
    }

    pub fn percent(&self) -> u8 {
        self.progress.percent()
    }

    async fn execute(
        &self,
        url: Option<&str>,
        mode: UpdateMode,
        summary: &mut UpdateSummary,
    ) -> Result<UpdateStage, UpdateError> {
        let download = self.progress.enter(UpdateStage::Downloading);
        let store = self.open_store().await?;

        let (mut store, url) = match url {
            Some(url) => (store, url.to_string()),
            None => {
                let (store, persisted) =
                    with_store(store, |s| s.read_setting(keys::SOURCE_URL)).await?;
                let url = persisted?
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or_else(|| self.config.source.url.clone());
                (store, url)
            }
        };
        summary.url = Some(url.clone());

        tracing::info!(
            run_id = %summary.run_id,
            url = %url,
            mode = ?mode,
            store = %self.opener.describe(),
            "Starting GTFS update"
        );

        let detector =
            ChangeDetector::new(self.config.change_detection.strategy, self.logger.clone());
        let previous = match mode {
            UpdateMode::Check => {
                let (returned, record) =
                    with_store(store, |s| ChangeDetector::load_committed_record(s)).await?;
                store = returned;
                record?
            }
            UpdateMode::Force => None,
        };

        let fetcher = Fetcher::new(
            Arc::clone(&self.source),
            &self.config.staging,
            &self.config.source,
            self.logger.clone(),
        );

        if mode == UpdateMode::Check && self.config.change_detection.size_precheck {
            match fetcher.remote_size(&url).await {
                Ok(size) if !detector.remote_size_differs(size, previous.as_ref()) => {
                    self.progress.enter(UpdateStage::Comparing);
                    return Ok(UpdateStage::NoUpdateNeeded);
                }
                Ok(_) => {}
                Err(e) => self.logger.log(
                    LogGroup::Error,
                    format!("Size pre-check failed, downloading anyway: {e}"),
                ),
            }
        }

        self.check_cancelled()?;
        let handle = fetcher.fetch(&url, &download).await?;
        summary.set_archive(&handle);
        self.check_cancelled()?;

        if mode == UpdateMode::Check {
            let comparing = self.progress.enter(UpdateStage::Comparing);
            let needed = detector.is_update_needed(&handle, previous.as_ref())?;
            comparing.report(100);
            if !needed {
                return Ok(UpdateStage::NoUpdateNeeded);
            }
            self.check_cancelled()?;
        }

        let extracting = self.progress.enter(UpdateStage::Extracting);
        let extractor = Extractor::new(
            &self.config.staging,
            &self.config.import,
            self.logger.clone(),
        );
        let extract_handle = handle.clone();
        let staged = tokio::task::spawn_blocking(move || {
            extractor.extract(&extract_handle, &extracting)
        })
        .await
        .map_err(task_error)??;

        if let Err(e) = self.check_cancelled() {
            discard_staged(staged, &self.logger);
            return Err(e);
        }

        let importing = self.progress.enter(UpdateStage::Importing);
        let importer = TableImporter::new(&self.config.import, self.logger.clone());
        let cancel = self.shutdown.clone();
        let discard = self.config.staging.discard_after_import;
        let logger = self.logger.clone();
        let (_store, imported) = with_store(store, move |s| {
            let result = match importer.import_all(&mut *s, &staged, &importing, &cancel) {
                Ok(report) => detector
                    .record_import(s, &handle)
                    .map(|_| report)
                    .map_err(UpdateError::from),
                Err(e) => Err(UpdateError::from(e)),
            };
            if discard {
                discard_staged(staged, &logger);
            }
            result
        })
        .await?;

        summary.set_import(imported?);
        Ok(UpdateStage::Completed)
    }

    /// Open the store, retrying while another connection holds its lock
    async fn open_store(&self) -> Result<Box<dyn DestinationStore>, UpdateError> {
        let policy = RetryPolicy::from_config(&self.config.store.retry);
        retry(
            &policy,
            |e: &UpdateError| matches!(e, UpdateError::Store(s) if s.is_busy()),
            || {
                let opener = Arc::clone(&self.opener);
                async move {
                    tokio::task::spawn_blocking(move || opener.open())
                        .await
                        .map_err(task_error)?
                        .map_err(UpdateError::from)
                }
            },
        )
        .await
    }

    fn check_cancelled(&self) -> Result<(), UpdateError> {
        if *self.shutdown.borrow() {
            return Err(UpdateError::Cancelled);
        }
        Ok(())
    }
}

/// Run a store operation on the blocking pool, handing the store back
async fn with_store<T, F>(
    mut store: Box<dyn DestinationStore>,
    operation: F,
) -> Result<(Box<dyn DestinationStore>, T), UpdateError>
where
    F: FnOnce(&mut dyn DestinationStore) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let output = operation(store.as_mut());
        (store, output)
    })
    .await
    .map_err(task_error)
}

fn task_error(e: JoinError) -> UpdateError {
    UpdateError::Task(e.to_string())
}

fn discard_staged(staged: StagedFileSet, logger: &GroupLogger) {
    if let Err(e) = staged.discard() {
        logger.log(
            LogGroup::Error,
            format!("Failed to remove staged files: {e}"),
        );
    }
}

/// Terminal stage for a failed run
///
/// Stage errors pick their own terminal; store and task failures take the
/// terminal of the stage that was running.
fn failure_stage(error: &UpdateError, current: UpdateStage) -> UpdateStage {
    if error.is_cancelled() {
        return UpdateStage::Cancelled;
    }
    match error {
        UpdateError::Download(_) => UpdateStage::DownloadError,
        UpdateError::Comparison(_) => UpdateStage::ComparisonError,
        UpdateError::Extraction(_) => UpdateStage::ExtractionError,
        UpdateError::Import(_) => UpdateStage::ImportError,
        _ => match current {
            UpdateStage::Comparing => UpdateStage::ComparisonError,
            UpdateStage::Extracting => UpdateStage::ExtractionError,
            UpdateStage::Importing => UpdateStage::ImportError,
            _ => UpdateStage::DownloadError,
        },
    }
}
