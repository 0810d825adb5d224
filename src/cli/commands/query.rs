//! Search and schedule command implementations
//!
//! Read-only lookups against an imported store.

use super::{group_logger, load_or_default, open_store};
use crate::adapters::store::{keys, search_stops, stop_schedule, DestinationStore, SqliteStore};
use crate::config::SyncConfig;
use clap::Args;
use std::path::Path;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text to look for in stop names, codes and descriptions
    pub text: String,

    /// Print matches as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the schedule command
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Stop identifier
    pub stop_id: String,

    /// Print arrivals as JSON
    #[arg(long)]
    pub json: bool,
}

/// Open the store for reading, or the exit code explaining why not
fn open_for_query(config_path: &str) -> Result<(SyncConfig, SqliteStore), i32> {
    let config = load_or_default(config_path).map_err(|e| {
        println!("❌ Failed to load configuration file");
        println!("   Error: {e}");
        2
    })?;

    if !Path::new(&config.store.path).exists() {
        println!("No store found at {}.", config.store.path);
        println!("Run 'gtfs-sync update' to import data.");
        return Err(4);
    }

    let store = open_store(&config).map_err(|e| {
        println!("❌ Failed to open store");
        println!("   Error: {e}");
        4
    })?;

    if let Ok(Some(false)) = store.read_flag(keys::IMPORT_COMPLETE) {
        println!("⚠️  The last import did not complete; results may be partial.");
    }
    Ok((config, store))
}

impl SearchArgs {
    /// Execute the search command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (config, store) = match open_for_query(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        let matches = search_stops(&store, &self.text, &group_logger(&config))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&matches)?);
            return Ok(0);
        }

        if matches.is_empty() {
            println!("No stops match '{}'.", self.text);
            return Ok(0);
        }

        println!("{:<12} Name", "Stop ID");
        println!("{}", "-".repeat(60));
        for stop in &matches {
            println!("{:<12} {}", stop.stop_id, stop.stop_name);
        }
        Ok(0)
    }
}

impl ScheduleArgs {
    /// Execute the schedule command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (config, store) = match open_for_query(config_path) {
            Ok(opened) => opened,
            Err(code) => return Ok(code),
        };

        let arrivals = stop_schedule(&store, &self.stop_id, &group_logger(&config))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&arrivals)?);
            return Ok(0);
        }

        if arrivals.is_empty() {
            println!("No scheduled arrivals at stop {}.", self.stop_id);
            return Ok(0);
        }

        println!("{:<10} {:<24} {:>8}", "Arrival", "Trip", "Seq");
        println!("{}", "-".repeat(44));
        for arrival in &arrivals {
            println!(
                "{:<10} {:<24} {:>8}",
                arrival.arrival_time, arrival.trip_id, arrival.stop_sequence
            );
        }
        Ok(0)
    }
}
