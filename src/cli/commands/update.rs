//! Update command implementation
//!
//! This module implements the `update` command, which runs the refresh
//! pipeline once against the configured store.

use super::{group_logger, load_or_default};
use crate::adapters::source::{ArchiveSource, SchemeRouter};
use crate::adapters::store::{keys, DestinationStore, MemoryStore, StoreOpener};
use crate::config::SyncConfig;
use crate::core::update::{UpdateCoordinator, UpdateSummary};
use crate::domain::{UpdateMode, UpdateStage};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the update command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Import even when the archive is unchanged
    #[arg(short, long)]
    pub force: bool,

    /// Archive URL for this run (http, https, file or a local path)
    #[arg(long)]
    pub url: Option<String>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Run the pipeline against an in-memory store, leaving the database untouched
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl UpdateArgs {
    /// Execute the update command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting update command");

        let config = match load_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Configuration validation failed");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let mode = if self.force {
            UpdateMode::Force
        } else {
            UpdateMode::Check
        };

        if self.dry_run {
            tracing::info!("Dry run mode enabled - the store will not be written");
            println!("🔍 DRY RUN MODE - No data will be written to {}", config.store.path);
            println!();
        }

        if !self.yes && !self.dry_run && !self.json {
            println!("Update Configuration:");
            println!(
                "  Source: {}",
                self.url.as_deref().unwrap_or("persisted or configured URL")
            );
            println!("  Store: {}", config.store.path);
            println!(
                "  Mode: {}",
                if self.force { "force" } else { "import if changed" }
            );
            println!("  Batch size: {}", config.import.batch_size);
            println!();
            print!("Proceed with update? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Update cancelled.");
                return Ok(0);
            }
        }

        let coordinator = match self.build_coordinator(config, shutdown_signal) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create update coordinator");
                eprintln!("Failed to initialize update: {e}");
                return Ok(4);
            }
        };

        if !self.json {
            println!("🚀 Starting update...");
        }
        let watcher = (!self.json).then(|| spawn_stage_printer(&coordinator));

        let summary = match coordinator.run(self.url.as_deref(), mode).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Update failed to start");
                eprintln!("Update failed: {e}");
                return Ok(5);
            }
        };

        if let Some(watcher) = watcher {
            watcher.abort();
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary);
        }

        Ok(exit_code(&summary))
    }

    fn build_coordinator(
        &self,
        config: SyncConfig,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<UpdateCoordinator> {
        if !self.dry_run {
            return Ok(UpdateCoordinator::from_config(config, shutdown_signal)?);
        }

        let logger = group_logger(&config);
        let source: Arc<dyn ArchiveSource> = Arc::new(SchemeRouter::new(&config.source)?);
        let store = MemoryStore::new();
        // carry the persisted URL over to the in-memory store
        if self.url.is_none() && Path::new(&config.store.path).exists() {
            let sqlite = super::open_store(&config)?;
            if let Some(url) = sqlite.read_setting(keys::SOURCE_URL)? {
                store.clone().write_setting(keys::SOURCE_URL, &url)?;
            }
        }
        let opener: Arc<dyn StoreOpener> = Arc::new(store);
        Ok(UpdateCoordinator::new(
            config,
            source,
            opener,
            logger,
            shutdown_signal,
        ))
    }
}

/// Print stage changes while a run is in flight
fn spawn_stage_printer(coordinator: &UpdateCoordinator) -> tokio::task::JoinHandle<()> {
    let mut stage_rx = coordinator.subscribe_stage();
    let mut table_rx = coordinator.subscribe_table();
    let percent_rx = coordinator.subscribe_percent();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = stage_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let stage = *stage_rx.borrow_and_update();
                    if !stage.is_terminal() {
                        println!("  → {} ({}%)", stage.description(), *percent_rx.borrow());
                    }
                }
                changed = table_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if let Some(table) = table_rx.borrow_and_update().clone() {
                        println!("    importing {table} ({}%)", *percent_rx.borrow());
                    }
                }
            }
        }
    })
}

fn print_summary(summary: &UpdateSummary) {
    println!();
    println!("📊 Update Summary:");
    println!("  Run: {}", summary.run_id);
    if let Some(url) = &summary.url {
        println!("  Source: {url}");
    }
    println!("  Result: {}", summary.stage.description());
    if let Some(bytes) = summary.archive_bytes {
        println!("  Archive: {bytes} bytes");
    }
    if let Some(digest) = &summary.archive_sha256 {
        println!("  SHA-256: {digest}");
    }
    if !summary.tables.is_empty() {
        println!("  Tables:");
        for (table, stats) in &summary.tables {
            println!(
                "    {:<16} {:>10} rows  {:>6} skipped",
                table, stats.inserted, stats.skipped
            );
        }
    }
    println!("  Duration: {:.2}s", summary.duration().as_secs_f64());
    println!();

    match summary.stage {
        UpdateStage::Completed => println!("✅ Update completed successfully!"),
        UpdateStage::NoUpdateNeeded => println!("✅ Data is already up to date"),
        UpdateStage::Cancelled => {
            println!("⚠️  Update interrupted. The previous data was left in place.");
        }
        _ => {
            println!("❌ {}", summary.stage.description());
            if let Some(error) = &summary.error {
                println!("   Error: {error}");
            }
        }
    }
}

/// Process exit code for a finished run
pub fn exit_code(summary: &UpdateSummary) -> i32 {
    if summary.is_successful() {
        0
    } else if summary.stage == UpdateStage::Cancelled {
        130
    } else if summary.unreachable {
        4
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(UpdateStage::Completed, false, 0 ; "completed")]
    #[test_case(UpdateStage::NoUpdateNeeded, false, 0 ; "no update needed")]
    #[test_case(UpdateStage::Cancelled, false, 130 ; "cancelled")]
    #[test_case(UpdateStage::DownloadError, true, 4 ; "unreachable")]
    #[test_case(UpdateStage::ImportError, false, 1 ; "import failed")]
    fn test_exit_code(stage: UpdateStage, unreachable: bool, expected: i32) {
        let mut summary = UpdateSummary::new(UpdateMode::Check);
        summary.stage = stage;
        summary.unreachable = unreachable;
        assert_eq!(exit_code(&summary), expected);
    }

    #[test]
    fn test_update_args_defaults() {
        let args = UpdateArgs {
            force: false,
            url: None,
            yes: false,
            dry_run: false,
            json: false,
        };
        assert!(!args.force);
        assert!(args.url.is_none());
    }

    #[tokio::test]
    async fn test_dry_run_leaves_database_untouched() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let dir = tempfile::TempDir::new().unwrap();
        let archive = dir.path().join("feed.zip");
        let mut writer = zip::ZipWriter::new(std::fs::File::create(&archive).unwrap());
        writer
            .start_file("agency.txt", SimpleFileOptions::default())
            .unwrap();
        writer
            .write_all(b"agency_name,agency_url,agency_timezone\nRTD,https://www.rtd-denver.com,America/Denver\n")
            .unwrap();
        writer.finish().unwrap();

        let db = dir.path().join("bus_schedule.db");
        let config_path = dir.path().join("gtfs-sync.toml");
        std::fs::write(
            &config_path,
            format!(
                "[staging]\ndir = \"{}\"\n\n[store]\npath = \"{}\"\n\n[import]\nrequired_tables = [\"agency\"]\n",
                dir.path().join("staging").display(),
                db.display()
            ),
        )
        .unwrap();

        let args = UpdateArgs {
            force: true,
            url: Some(archive.display().to_string()),
            yes: true,
            dry_run: true,
            json: true,
        };
        let (_tx, rx) = watch::channel(false);
        let code = args
            .execute(&config_path.display().to_string(), rx)
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert!(!db.exists());
    }
}
