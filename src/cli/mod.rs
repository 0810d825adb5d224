//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for gtfs-sync using clap.
//!
//! Exit codes: 0 success or no update needed, 1 run failed, 2 configuration
//! error, 4 store or source unreachable, 5 fatal, 130 interrupted.

pub mod commands;

use clap::{Parser, Subcommand};

/// gtfs-sync - GTFS transit data refresh pipeline
#[derive(Parser, Debug)]
#[command(name = "gtfs-sync")]
#[command(version, about, long_about = None)]
#[command(author = "gtfs-sync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "gtfs-sync.toml", env = "GTFS_SYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "GTFS_SYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the archive and refresh the store when it changed
    Update(commands::update::UpdateArgs),

    /// Show import state, last archive and table row counts
    Status(commands::status::StatusArgs),

    /// Persist the archive URL used by later updates
    SetUrl(commands::set_url::SetUrlArgs),

    /// Search stops by name, code or description
    Search(commands::query::SearchArgs),

    /// List scheduled arrivals at a stop
    Schedule(commands::query::ScheduleArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_update() {
        let cli = Cli::parse_from(["gtfs-sync", "update"]);
        assert_eq!(cli.config, "gtfs-sync.toml");
        match cli.command {
            Commands::Update(args) => {
                assert!(!args.force);
                assert!(args.url.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_forced_update_with_url() {
        let cli = Cli::parse_from([
            "gtfs-sync",
            "update",
            "--force",
            "--yes",
            "--url",
            "file:///srv/feeds/google_transit.zip",
        ]);
        match cli.command {
            Commands::Update(args) => {
                assert!(args.force);
                assert!(args.yes);
                assert_eq!(
                    args.url.as_deref(),
                    Some("file:///srv/feeds/google_transit.zip")
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["gtfs-sync", "--config", "custom.toml", "status"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["gtfs-sync", "--log-level", "debug", "status"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_status_json() {
        let cli = Cli::parse_from(["gtfs-sync", "status", "--json"]);
        assert!(matches!(cli.command, Commands::Status(ref args) if args.json));
    }

    #[test]
    fn test_cli_parse_set_url() {
        let cli = Cli::parse_from(["gtfs-sync", "set-url", "https://example.com/gtfs.zip"]);
        assert!(matches!(
            cli.command,
            Commands::SetUrl(ref args) if args.url == "https://example.com/gtfs.zip"
        ));
    }

    #[test]
    fn test_cli_parse_queries() {
        let cli = Cli::parse_from(["gtfs-sync", "search", "Union Station"]);
        assert!(matches!(cli.command, Commands::Search(ref args) if args.text == "Union Station"));

        let cli = Cli::parse_from(["gtfs-sync", "schedule", "33756"]);
        assert!(matches!(cli.command, Commands::Schedule(ref args) if args.stop_id == "33756"));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["gtfs-sync", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["gtfs-sync", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
