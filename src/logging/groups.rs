//! Diagnostic log groups
//!
//! Pipeline components receive a [`GroupLogger`] at construction. Each
//! message belongs to a [`LogGroup`]; the injected [`LogGroups`] set decides
//! which groups are emitted. Emitted messages become tracing events tagged
//! with the group name and are optionally copied to a [`LogSink`].

use crate::config::LogGroupsConfig;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Diagnostic category of a pipeline message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogGroup {
    ImportSimple,
    ImportVerbose,
    DownloadSimple,
    ExtractorSimple,
    CompareSimple,
    QuerySimple,
    QueryVerbose,
    Error,
}

impl LogGroup {
    pub const ALL: [LogGroup; 8] = [
        LogGroup::ImportSimple,
        LogGroup::ImportVerbose,
        LogGroup::DownloadSimple,
        LogGroup::ExtractorSimple,
        LogGroup::CompareSimple,
        LogGroup::QuerySimple,
        LogGroup::QueryVerbose,
        LogGroup::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogGroup::ImportSimple => "IMPORT_SIMPLE",
            LogGroup::ImportVerbose => "IMPORT_VERBOSE",
            LogGroup::DownloadSimple => "DOWNLOAD_SIMPLE",
            LogGroup::ExtractorSimple => "EXTRACTOR_SIMPLE",
            LogGroup::CompareSimple => "COMPARE_SIMPLE",
            LogGroup::QuerySimple => "QUERY_SIMPLE",
            LogGroup::QueryVerbose => "QUERY_VERBOSE",
            LogGroup::Error => "ERROR",
        }
    }

    fn is_verbose(self) -> bool {
        matches!(self, LogGroup::ImportVerbose | LogGroup::QueryVerbose)
    }
}

impl fmt::Display for LogGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `{group: enabled}` set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGroups {
    enabled: BTreeMap<LogGroup, bool>,
}

impl LogGroups {
    /// Every group on
    pub fn all() -> Self {
        Self {
            enabled: LogGroup::ALL.iter().map(|g| (*g, true)).collect(),
        }
    }

    /// Every group off
    pub fn none() -> Self {
        Self {
            enabled: LogGroup::ALL.iter().map(|g| (*g, false)).collect(),
        }
    }

    pub fn from_config(config: &LogGroupsConfig) -> Self {
        Self {
            enabled: BTreeMap::from([
                (LogGroup::ImportSimple, config.import_simple),
                (LogGroup::ImportVerbose, config.import_verbose),
                (LogGroup::DownloadSimple, config.download_simple),
                (LogGroup::ExtractorSimple, config.extractor_simple),
                (LogGroup::CompareSimple, config.compare_simple),
                (LogGroup::QuerySimple, config.query_simple),
                (LogGroup::QueryVerbose, config.query_verbose),
                (LogGroup::Error, config.error),
            ]),
        }
    }

    /// Switch one group
    pub fn with(mut self, group: LogGroup, enabled: bool) -> Self {
        self.enabled.insert(group, enabled);
        self
    }

    pub fn is_enabled(&self, group: LogGroup) -> bool {
        self.enabled.get(&group).copied().unwrap_or(false)
    }
}

impl Default for LogGroups {
    fn default() -> Self {
        Self::from_config(&LogGroupsConfig::default())
    }
}

/// A recorded diagnostic message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub group: LogGroup,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Receives every emitted group message
pub trait LogSink: Send + Sync {
    fn record(&self, group: LogGroup, message: &str);
}

/// Bounded in-memory sink, newest entries kept
#[derive(Debug)]
pub struct MemoryLogSink {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl MemoryLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Snapshot of the buffered entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.iter().cloned().collect()
    }

    /// Buffered messages of one group
    pub fn messages(&self, group: LogGroup) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.group == group)
            .map(|e| e.message)
            .collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }
}

impl LogSink for MemoryLogSink {
    fn record(&self, group: LogGroup, message: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            group,
            message: message.to_string(),
            at: Utc::now(),
        });
    }
}

/// Group-gated logger handed to each pipeline component
///
/// # Examples
///
/// ```
/// use gtfs_sync::logging::{GroupLogger, LogGroup, LogGroups, MemoryLogSink};
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemoryLogSink::new(16));
/// let logger = GroupLogger::new(LogGroups::none().with(LogGroup::ImportSimple, true))
///     .with_sink(sink.clone());
///
/// logger.log(LogGroup::ImportSimple, "Imported 12 rows into stops");
/// logger.log(LogGroup::ImportVerbose, "row 7 skipped");
///
/// assert_eq!(sink.messages(LogGroup::ImportSimple).len(), 1);
/// assert!(sink.messages(LogGroup::ImportVerbose).is_empty());
/// ```
#[derive(Clone, Default)]
pub struct GroupLogger {
    groups: LogGroups,
    sink: Option<Arc<dyn LogSink>>,
}

impl GroupLogger {
    pub fn new(groups: LogGroups) -> Self {
        Self { groups, sink: None }
    }

    /// Copy emitted messages to a sink
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn is_enabled(&self, group: LogGroup) -> bool {
        self.groups.is_enabled(group)
    }

    /// Emit a message if its group is enabled
    pub fn log(&self, group: LogGroup, message: impl AsRef<str>) {
        if !self.is_enabled(group) {
            return;
        }
        let message = message.as_ref();
        if group == LogGroup::Error {
            tracing::error!(group = group.as_str(), "{message}");
        } else if group.is_verbose() {
            tracing::debug!(group = group.as_str(), "{message}");
        } else {
            tracing::info!(group = group.as_str(), "{message}");
        }
        if let Some(sink) = &self.sink {
            sink.record(group, message);
        }
    }

    /// Like [`GroupLogger::log`], building the message only when enabled
    pub fn log_with(&self, group: LogGroup, message: impl FnOnce() -> String) {
        if self.is_enabled(group) {
            self.log(group, message());
        }
    }
}

impl fmt::Debug for GroupLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupLogger")
            .field("groups", &self.groups)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_from_config_defaults() {
        let groups = LogGroups::default();
        assert!(groups.is_enabled(LogGroup::ImportSimple));
        assert!(!groups.is_enabled(LogGroup::ImportVerbose));
        assert!(!groups.is_enabled(LogGroup::QueryVerbose));
        assert!(groups.is_enabled(LogGroup::Error));
    }

    #[test]
    fn test_disabled_group_builds_nothing() {
        let logger = GroupLogger::new(LogGroups::none());
        let mut built = false;
        logger.log_with(LogGroup::ImportVerbose, || {
            built = true;
            String::from("expensive")
        });
        assert!(!built);
    }

    #[test]
    fn test_memory_sink_is_bounded() {
        let sink = MemoryLogSink::new(2);
        sink.record(LogGroup::DownloadSimple, "one");
        sink.record(LogGroup::DownloadSimple, "two");
        sink.record(LogGroup::DownloadSimple, "three");
        assert_eq!(sink.messages(LogGroup::DownloadSimple), vec!["two", "three"]);

        sink.clear();
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_group_names() {
        assert_eq!(LogGroup::ExtractorSimple.to_string(), "EXTRACTOR_SIMPLE");
        assert_eq!(LogGroup::ALL.len(), 8);
    }
}
