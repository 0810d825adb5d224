//! Status command implementation
//!
//! This module implements the `status` command for displaying the import
//! flag, the last imported archive and per-table row counts.

use super::{load_or_default, open_store};
use crate::adapters::store::{keys, DestinationStore};
use crate::config::SyncConfig;
use crate::core::compare::ChangeDetector;
use crate::domain::tables::TABLES;
use crate::domain::{ArchiveHandle, ArchiveRecord};
use crate::logging::GroupLogger;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Snapshot of what the store holds
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub store_path: String,
    /// Import-complete flag; `None` before the first import
    pub import_complete: Option<bool>,
    /// URL the next update resolves to
    pub source_url: String,
    /// Whether `source_url` came from the store rather than configuration
    pub source_url_persisted: bool,
    pub last_archive: Option<ArchiveRecord>,
    pub row_counts: BTreeMap<String, u64>,
    /// Whether the staged archive differs from the committed import;
    /// `None` when no archive is staged
    pub update_available: Option<bool>,
}

impl StatusReport {
    /// Collect the report from an open store
    pub fn collect(
        store: &dyn DestinationStore,
        config: &SyncConfig,
    ) -> anyhow::Result<Self> {
        let persisted = store
            .read_setting(keys::SOURCE_URL)?
            .filter(|url| !url.trim().is_empty());
        let mut row_counts = BTreeMap::new();
        for spec in TABLES.iter() {
            row_counts.insert(spec.name.to_string(), store.row_count(spec.name)?);
        }

        Ok(Self {
            store_path: config.store.path.clone(),
            import_complete: store.read_flag(keys::IMPORT_COMPLETE)?,
            source_url_persisted: persisted.is_some(),
            source_url: persisted.unwrap_or_else(|| config.source.url.clone()),
            last_archive: ChangeDetector::load_record(store)?,
            row_counts,
            update_available: staged_archive_differs(store, config)?,
        })
    }
}

/// Compare the archive left in staging with the committed import
fn staged_archive_differs(
    store: &dyn DestinationStore,
    config: &SyncConfig,
) -> anyhow::Result<Option<bool>> {
    let path = Path::new(&config.staging.dir).join(&config.staging.archive_name);
    let Ok(metadata) = std::fs::metadata(&path) else {
        return Ok(None);
    };
    if !metadata.is_file() {
        return Ok(None);
    }

    let previous = ChangeDetector::load_committed_record(store)?;
    let detector = ChangeDetector::new(config.change_detection.strategy, GroupLogger::default());
    let handle = ArchiveHandle::new(path, metadata.len());
    Ok(Some(detector.is_update_needed_lenient(&handle, previous.as_ref())))
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking store status");

        let config = match load_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if !Path::new(&config.store.path).exists() {
            println!("No store found at {}.", config.store.path);
            println!("Run 'gtfs-sync update' to import data.");
            return Ok(0);
        }

        let store = match open_store(&config) {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to open store");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let report = match StatusReport::collect(&store, &config) {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to read store status");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(0);
        }

        println!("📊 Store Status: {}", report.store_path);
        println!();
        let state = match report.import_complete {
            Some(true) => "✅ Complete",
            Some(false) => "❌ Incomplete (last import failed or is running)",
            None => "⏸️  Never imported",
        };
        println!("  Import: {state}");
        println!(
            "  Source: {}{}",
            report.source_url,
            if report.source_url_persisted { "" } else { " (default)" }
        );

        match &report.last_archive {
            Some(record) => {
                if let Some(digest) = &record.sha256 {
                    println!("  Archive SHA-256: {digest}");
                }
                if let Some(bytes) = record.byte_len {
                    println!("  Archive size: {bytes} bytes");
                }
                if let Some(at) = record.imported_at {
                    println!("  Imported at: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
                }
            }
            None => println!("  Archive: none recorded"),
        }
        match report.update_available {
            Some(true) => println!("  Staged archive: differs from the last import"),
            Some(false) => println!("  Staged archive: already imported"),
            None => {}
        }

        println!();
        println!("{:<16} {:>12}", "Table", "Rows");
        println!("{}", "-".repeat(29));
        for (table, count) in &report.row_counts {
            println!("{table:<16} {count:>12}");
        }
        println!();

        Ok(0)
    }
}
