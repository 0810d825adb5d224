//! Progress aggregation
//!
//! One [`ProgressTracker`] per coordinator owns the stage, percent and
//! current-table channels. Components report through a [`StageProgress`]
//! that scales their own 0-100 into the stage's slice of the overall bar.
//! Every write goes through `send_if_modified` with a max-only comparison, so
//! the percent never regresses within a run.

use crate::domain::UpdateStage;
use crate::log_stage_transition;
use std::sync::Arc;
use tokio::sync::watch;

/// Slice of the overall percent a stage owns
pub fn stage_span(stage: UpdateStage) -> (u8, u8) {
    match stage {
        UpdateStage::Idle => (0, 0),
        UpdateStage::Downloading => (0, 40),
        UpdateStage::Comparing => (40, 45),
        UpdateStage::Extracting => (45, 55),
        UpdateStage::Importing => (55, 99),
        UpdateStage::Completed | UpdateStage::NoUpdateNeeded => (100, 100),
        _ => (0, 0),
    }
}

fn advance(sender: &watch::Sender<u8>, value: u8) -> bool {
    let value = value.min(100);
    sender.send_if_modified(|current| {
        if value > *current {
            *current = value;
            true
        } else {
            false
        }
    })
}

/// Handle a component uses to report progress within one stage
#[derive(Debug, Clone)]
pub struct StageProgress {
    sender: Arc<watch::Sender<u8>>,
    table: Option<Arc<watch::Sender<Option<String>>>>,
    start: u8,
    end: u8,
}

impl StageProgress {
    /// A handle nobody observes, for running a component on its own
    pub fn detached() -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            sender: Arc::new(sender),
            table: None,
            start: 0,
            end: 100,
        }
    }

    /// Report `percent` (0-100) of this stage's work
    pub fn report(&self, percent: u8) {
        let percent = u32::from(percent.min(100));
        let width = u32::from(self.end.saturating_sub(self.start));
        let scaled = u32::from(self.start) + width * percent / 100;
        advance(&self.sender, scaled as u8);
    }

    /// Report `done` of `total` units
    pub fn report_fraction(&self, done: u64, total: u64) {
        if total == 0 {
            return;
        }
        let percent = (done.min(total) as u128 * 100 / total as u128) as u8;
        self.report(percent);
    }

    /// Current overall percent
    pub fn overall(&self) -> u8 {
        *self.sender.borrow()
    }

    /// Publish the table currently being written
    pub fn set_table(&self, table: Option<&str>) {
        if let Some(sender) = &self.table {
            publish_table(sender, table);
        }
    }
}

fn publish_table(sender: &watch::Sender<Option<String>>, table: Option<&str>) {
    sender.send_if_modified(|current| {
        if current.as_deref() != table {
            *current = table.map(str::to_string);
            true
        } else {
            false
        }
    });
}

/// Stage, percent and current-table channels of one coordinator
#[derive(Debug)]
pub struct ProgressTracker {
    stage: watch::Sender<UpdateStage>,
    percent: Arc<watch::Sender<u8>>,
    table: Arc<watch::Sender<Option<String>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (stage, _) = watch::channel(UpdateStage::Idle);
        let (percent, _) = watch::channel(0);
        let (table, _) = watch::channel(None);
        Self {
            stage,
            percent: Arc::new(percent),
            table: Arc::new(table),
        }
    }

    pub fn subscribe_stage(&self) -> watch::Receiver<UpdateStage> {
        self.stage.subscribe()
    }

    pub fn subscribe_percent(&self) -> watch::Receiver<u8> {
        self.percent.subscribe()
    }

    pub fn subscribe_table(&self) -> watch::Receiver<Option<String>> {
        self.table.subscribe()
    }

    pub fn stage(&self) -> UpdateStage {
        *self.stage.borrow()
    }

    pub fn percent(&self) -> u8 {
        *self.percent.borrow()
    }

    /// Start of a run: percent back to 0, no current table
    pub fn reset(&self) {
        self.percent.send_replace(0);
        self.table.send_replace(None);
    }

    /// Move to `next`, returning the handle for the stage's own progress
    ///
    /// Illegal moves are logged and ignored; the returned handle then still
    /// reports into `next`'s span.
    pub fn enter(&self, next: UpdateStage) -> StageProgress {
        let current = self.stage();
        if current.can_transition_to(next) {
            log_stage_transition!(current, next);
            self.stage.send_replace(next);
        } else {
            tracing::warn!(from = ?current, to = ?next, "Ignoring illegal stage transition");
        }

        let (start, end) = stage_span(next);
        advance(&self.percent, start);
        if next.is_terminal() {
            self.table.send_replace(None);
        }
        StageProgress {
            sender: Arc::clone(&self.percent),
            table: Some(Arc::clone(&self.table)),
            start,
            end,
        }
    }

    pub fn set_table(&self, table: Option<&str>) {
        publish_table(&self.table, table);
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
