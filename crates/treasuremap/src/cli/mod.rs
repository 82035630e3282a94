//! Command-line interface for treasuremap.
//!
//! This module provides the CLI structure for the `tmap` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ClearCommand, ConfigCommand, CoordinateArgs, ExportCommand, FormatArg, ListCommand,
};

use crate::logging::Verbosity;

/// tmap - Place, keep, and share treasure map flags
///
/// Flags are stored locally and can be exported to the logbook application
/// as plain text or structured JSON.
#[derive(Debug, Parser)]
#[command(name = "tmap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Place a flag at a coordinate
    Add(CoordinateArgs),

    /// Remove every flag at exactly this coordinate
    Remove(CoordinateArgs),

    /// Remove all flags
    Clear(ClearCommand),

    /// List flags
    List(ListCommand),

    /// Print the export payload, optionally sending it to the logbook
    Export(ExportCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
