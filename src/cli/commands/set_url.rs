//! Set-url command implementation
//!
//! Persists the archive URL as the `gtfs_url` store setting, which later
//! updates use when no `--url` is given.

use super::{load_or_default, open_store};
use crate::adapters::source::source_kind;
use crate::adapters::store::{keys, DestinationStore};
use clap::Args;

/// Arguments for the set-url command
#[derive(Args, Debug)]
pub struct SetUrlArgs {
    /// Archive URL (http, https, file or a local path)
    pub url: String,
}

impl SetUrlArgs {
    /// Execute the set-url command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let url = self.url.trim();
        tracing::info!(url = %url, "Setting archive URL");

        if let Err(e) = source_kind(url) {
            println!("❌ {e}");
            return Ok(2);
        }

        let config = match load_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let mut store = match open_store(&config) {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to open store");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        store.write_setting(keys::SOURCE_URL, url)?;
        println!("✅ Archive URL set to {url}");
        println!("   Run 'gtfs-sync update' to import from it.");
        Ok(0)
    }
}
