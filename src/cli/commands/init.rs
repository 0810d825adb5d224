//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "gtfs-sync.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing gtfs-sync configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, Self::generate_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Validate configuration: gtfs-sync validate-config");
                println!("  3. Run an update: gtfs-sync update");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate a configuration with every section and its defaults
    pub fn generate_config() -> String {
        r#"# gtfs-sync Configuration File
# GTFS transit data refresh pipeline

[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Archive Source
# ============================================================================
[source]
# Default archive URL; 'gtfs-sync set-url' persists an override in the store
url = "https://www.rtd-denver.com/files/gtfs/google_transit.zip"

# Seconds to wait for a connection
connect_timeout_seconds = 30

# Seconds without a received chunk before the download is abandoned
stall_timeout_seconds = 60

# ============================================================================
# Staging
# ============================================================================
[staging]
# Directory for the downloaded archive and extracted files
dir = "gtfs_data"
archive_name = "google_transit.zip"

# Remove extracted files once a run ends
discard_after_import = true

# ============================================================================
# Change Detection
# ============================================================================
[change_detection]
# sha256 | size
strategy = "sha256"

# Ask the server for the archive size first and skip the download on a match
size_precheck = false

# ============================================================================
# Import
# ============================================================================
[import]
# Rows per bulk insert (1-2000)
batch_size = 1000

# Parse tables on worker threads while a single writer inserts
parallel_parse = true

# Tables the archive must contain
required_tables = ["agency", "calendar", "calendar_dates", "routes", "stops", "trips", "stop_times"]

# ============================================================================
# Destination Store
# ============================================================================
[store]
# SQLite database file; ${VAR} references are expanded
path = "bus_schedule.db"
busy_timeout_ms = 5000

[store.retry]
max_attempts = 5
initial_delay_ms = 100
max_delay_ms = 2000
backoff_multiplier = 2.0

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON file logging in addition to the console
local_enabled = false
local_path = "logs"
local_rotation = "daily"  # daily | hourly

[logging.groups]
import_simple = true
import_verbose = false
download_simple = true
extractor_simple = true
compare_simple = true
query_simple = true
query_verbose = false
error = true
"#
        .to_string()
    }
}
