//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the gtfs-sync configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates before returning
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Source URL: {}", config.source.url);
        println!(
            "  Timeouts: connect {}s, stall {}s",
            config.source.connect_timeout_seconds, config.source.stall_timeout_seconds
        );
        println!("  Staging Directory: {}", config.staging.dir);
        println!(
            "  Change Detection: {:?}{}",
            config.change_detection.strategy,
            if config.change_detection.size_precheck {
                " with size pre-check"
            } else {
                ""
            }
        );
        println!("  Batch Size: {}", config.import.batch_size);
        println!("  Parallel Parse: {}", config.import.parallel_parse);
        println!("  Required Tables: {:?}", config.import.required_tables);
        println!("  Store: {}", config.store.path);
        println!(
            "  Store Retry: {} attempts from {}ms",
            config.store.retry.max_attempts, config.store.retry.initial_delay_ms
        );
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_validate_reports_bad_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gtfs-sync.toml");
        std::fs::write(&path, "[change_detection]\nstrategy = \"md5\"\n").unwrap();

        let code = ValidateArgs {}
            .execute(&path.display().to_string())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_validate_accepts_generated_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gtfs-sync.toml");
        std::fs::write(&path, super::super::init::InitArgs::generate_config()).unwrap();

        let code = ValidateArgs {}
            .execute(&path.display().to_string())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }
}
