//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// card-aggregator - statistics over every Magic: The Gathering printing
///
/// Downloads the Scryfall default cards bulk file, streams it through a set
/// of aggregators and renders browsable HTML/JSON reports.
///
/// Examples:
///   card-aggregator download
///   card-aggregator run --download
///   card-aggregator run --input data/default-cards-20240101100000.json
///   card-aggregator update-types
///   card-aggregator init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for card_aggregator.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Folder for bulk files and generated output
    #[arg(long, value_name = "DIR", env = "CARD_AGGREGATOR_DATA", global = true)]
    pub data_folder: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download the latest default cards bulk file
    Download,

    /// Run every aggregator and render the reports
    Run(RunArgs),

    /// Refresh the creature and land type tables from the comprehensive rules
    UpdateTypes,

    /// Generate a default card_aggregator.toml configuration file
    InitConfig,
}

/// Options for the `run` subcommand.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Download the latest bulk file before running
    #[arg(long, conflicts_with = "input")]
    pub download: bool,

    /// Bulk file to process instead of the latest cached one
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Command::Run(RunArgs {
            input: Some(ref input),
            ..
        }) = self.command
        {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
