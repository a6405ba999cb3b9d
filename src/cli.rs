//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::config::WidgetConfig;
use crate::models::Coordinate;
use crate::output::Format;

/// Find the Landsat scene under your cursor for any day.
#[derive(Parser, Debug)]
#[command(name = "scenetrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// TOML file overriding the built-in defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find the scene for one coordinate and day, then exit
    Lookup(LookupArgs),

    /// Track cursor positions read from stdin
    Watch(WatchArgs),

    /// Start the web UI server
    Ui(UiArgs),
}

/// Overrides shared by every command.
#[derive(Args, Debug, Default)]
pub struct WidgetArgs {
    /// STAC item search endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Half-width of the search box in degrees
    #[arg(long)]
    pub padding: Option<f64>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Clear the found scene when a fetch fails
    #[arg(long)]
    pub clear_on_error: bool,
}

impl WidgetArgs {
    /// Apply the set flags on top of a loaded config.
    #[must_use]
    pub fn apply(self, mut config: WidgetConfig) -> WidgetConfig {
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(padding) = self.padding {
            config.bbox_padding = padding;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if self.clear_on_error {
            config.clear_imagery_on_error = true;
        }
        config
    }
}

/// Arguments for the `lookup` command.
#[derive(Parser, Debug)]
pub struct LookupArgs {
    /// Position to search around: lat,lng (defaults to the configured start)
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    pub at: Option<Coordinate>,

    /// Day to search (YYYY-MM-DD, defaults to today UTC)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,

    #[command(flatten)]
    pub widget: WidgetArgs,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Starting day (YYYY-MM-DD, defaults to today UTC)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,

    /// Print the raw scene record with each human-readable update
    #[arg(long)]
    pub details: bool,

    #[command(flatten)]
    pub widget: WidgetArgs,
}

/// Arguments for the `ui` command.
#[derive(Parser, Debug)]
pub struct UiArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,

    #[command(flatten)]
    pub widget: WidgetArgs,
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a coordinate from string.
fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    s.parse().map_err(|e: crate::errors::ScenetrackError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_args() {
        let cli = Cli::try_parse_from([
            "scenetrack",
            "lookup",
            "--at",
            "37.77,-122.42",
            "--date",
            "2024-03-01",
            "--padding",
            "0.5",
        ])
        .unwrap();

        let Command::Lookup(args) = cli.command else {
            panic!("expected lookup");
        };
        assert_eq!(args.at, Some(Coordinate::new(37.77, -122.42).unwrap()));
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 3, 1));

        let config = args.widget.apply(WidgetConfig::default());
        assert!((config.bbox_padding - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        assert!(Cli::try_parse_from(["scenetrack", "lookup", "--at", "200,0"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "scenetrack",
            "ui",
            "--verbose",
            "--config",
            "scenetrack.toml",
            "--clear-on-error",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("scenetrack.toml")));

        let Command::Ui(args) = cli.command else {
            panic!("expected ui");
        };
        assert_eq!(args.port, 8080);
        assert!(args.widget.apply(WidgetConfig::default()).clear_imagery_on_error);
    }
}
