//! Shared CLI definitions for crimeboard.
//!
//! Used by the main application and by the build script (manpage).

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Dashboard page to open on start-up (or to render with `--print`).
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum PageArg {
    /// Incidents per police district and year (area chart)
    #[default]
    Districts,
    /// Incidents per category and calendar month (line chart)
    Monthly,
    /// Incident locations for one category (hexagon map)
    Locations,
}

impl PageArg {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Districts => "districts",
            Self::Monthly => "monthly",
            Self::Locations => "locations",
        }
    }
}

/// Command-line arguments for crimeboard
#[derive(Clone, Parser, Debug)]
#[command(
    name = "crimeboard",
    version,
    about = "SFPD incident dashboards in the terminal",
    long_about = "Interactive dashboards over SFPD incident counts stored in BigQuery.\n\n\
                  The access token is read from the environment variable named by \
                  [warehouse] access_token_env (default: GOOGLE_OAUTH_ACCESS_TOKEN)."
)]
pub struct Args {
    /// Page to open (districts, monthly, locations). Defaults to
    /// [display] start_page from config.
    #[arg(long = "page", value_enum)]
    pub page: Option<PageArg>,

    /// Category keys to select on the opened page. Repeat for multi-select pages.
    /// When omitted, the page's configured default selection is used.
    #[arg(long = "select", value_name = "KEY")]
    pub select: Vec<String>,

    /// Render the page once to stdout instead of starting the interactive UI
    #[arg(long = "print", action)]
    pub print: bool,

    /// Write the page's chart to a PNG file (implies a single headless render)
    #[arg(long = "export-chart", value_name = "PNG")]
    pub export_chart: Option<PathBuf>,

    /// Write the page's table to a CSV file (implies a single headless render)
    #[arg(long = "export-table", value_name = "CSV")]
    pub export_table: Option<PathBuf>,

    /// GCP project that runs the queries (overrides config [warehouse] project_id)
    #[arg(long = "project", value_name = "PROJECT")]
    pub project: Option<String>,

    /// Configuration file layered over ~/.config/crimeboard/config.toml
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug mode: debug-level logging and the operational overlay
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Clear all cache data (log files) and exit
    #[arg(long = "clear-cache", action)]
    pub clear_cache: bool,

    /// Generate default configuration file at ~/.config/crimeboard/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

impl Args {
    /// True when the run renders once without the interactive UI.
    pub fn is_headless(&self) -> bool {
        self.print || self.export_chart.is_some() || self.export_table.is_some()
    }
}
