//! Update stages and run modes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Observable stage of the update state machine
///
/// Stages only move forward within a run. Every failure ends in a terminal
/// distinct from [`UpdateStage::Completed`] and [`UpdateStage::NoUpdateNeeded`].
///
/// # Examples
///
/// ```
/// use gtfs_sync::domain::UpdateStage;
///
/// assert!(UpdateStage::Idle.can_transition_to(UpdateStage::Downloading));
/// assert!(!UpdateStage::Importing.can_transition_to(UpdateStage::Extracting));
/// assert!(UpdateStage::ImportError.is_failure());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStage {
    #[default]
    Idle,
    Downloading,
    Comparing,
    Extracting,
    Importing,
    Completed,
    NoUpdateNeeded,
    DownloadError,
    ComparisonError,
    ExtractionError,
    ImportError,
    Cancelled,
}

impl UpdateStage {
    fn ordinal(self) -> u8 {
        match self {
            UpdateStage::Idle => 0,
            UpdateStage::Downloading => 1,
            UpdateStage::Comparing => 2,
            UpdateStage::Extracting => 3,
            UpdateStage::Importing => 4,
            _ => 5,
        }
    }

    /// Whether the run has ended
    pub fn is_terminal(self) -> bool {
        self.ordinal() == 5
    }

    /// Terminal success: data imported or already current
    pub fn is_success(self) -> bool {
        matches!(self, UpdateStage::Completed | UpdateStage::NoUpdateNeeded)
    }

    /// Terminal failure, the generic `Failed` outcome for callers
    pub fn is_failure(self) -> bool {
        self.is_terminal() && !self.is_success()
    }

    /// Whether `next` is a legal move from this stage
    ///
    /// A terminal stage may only start a new run. `NoUpdateNeeded` is reached
    /// from `Comparing` alone.
    pub fn can_transition_to(self, next: UpdateStage) -> bool {
        if self.is_terminal() {
            return matches!(next, UpdateStage::Idle | UpdateStage::Downloading);
        }
        if next == UpdateStage::NoUpdateNeeded {
            return self == UpdateStage::Comparing;
        }
        next.ordinal() > self.ordinal()
    }

    /// Caller-facing description of the stage
    pub fn description(self) -> &'static str {
        match self {
            UpdateStage::Idle => "Idle",
            UpdateStage::Downloading => "Downloading GTFS archive",
            UpdateStage::Comparing => "Checking for changes",
            UpdateStage::Extracting => "Extracting archive",
            UpdateStage::Importing => "Importing tables",
            UpdateStage::Completed => "Update complete",
            UpdateStage::NoUpdateNeeded => "Data is already up to date",
            UpdateStage::DownloadError => "Download failed",
            UpdateStage::ComparisonError => "Change detection failed",
            UpdateStage::ExtractionError => "Extraction failed",
            UpdateStage::ImportError => "Import failed",
            UpdateStage::Cancelled => "Update cancelled",
        }
    }
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// How a run treats change detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Import only when the archive changed
    Check,
    /// Always download and import
    Force,
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateMode::Check => f.write_str("check"),
            UpdateMode::Force => f.write_str("force"),
        }
    }
}
