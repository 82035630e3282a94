//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::export::ExportFormat;

/// A coordinate pair given on the command line.
#[derive(Debug, Clone, Copy, Args)]
pub struct CoordinateArgs {
    /// Latitude in degrees (e.g. 46.94799)
    #[arg(allow_negative_numbers = true)]
    pub latitude: f64,

    /// Longitude in degrees (e.g. 7.44744)
    #[arg(allow_negative_numbers = true)]
    pub longitude: f64,
}

/// Clear command arguments.
#[derive(Debug, Args)]
pub struct ClearCommand {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Payload format (defaults to the configured format)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Hand the payload to the logbook application
    #[arg(short, long)]
    pub send: bool,

    /// Send without asking for confirmation
    #[arg(short, long, requires = "send")]
    pub yes: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Export format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// `Flag <n>: <lat>, <lng>` lines
    Plain,
    /// JSON with micro-degree points
    Structured,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Plain => Self::Plain,
            FormatArg::Structured => Self::Structured,
        }
    }
}
