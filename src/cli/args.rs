//! Command-line argument definitions for the AGCD analyzer
//!
//! Defines the CLI interface using the clap derive API: a `process` command
//! that runs the full analysis, and a `sites` command that validates and
//! summarizes the site list.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::{Error, Result};

/// CLI arguments for the AGCD site-level climate analyzer
///
/// Analyses daily gridded climate data at seed-collection sites: lookback
/// climate windows from a day to five years, plus heatwave, atmospheric
/// dryness and rainfall-deficit metrics.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "agcd-analyzer",
    version,
    about = "Site-level lookback climate windows and extreme-event metrics from daily AGCD data",
    long_about = "Computes, for every site and seed-collection date in a site list, climate \
                  summaries over lookback windows (day, week, month, three months, five years) \
                  and extreme-event metrics (heatwaves, atmospheric dry spells, rainless spells) \
                  from per-coordinate daily series files, and writes the result CSV files."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for the analyzer
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Analyze all sites and write the result files (main command)
    Process(ProcessArgs),
    /// Validate the site list and report its contents
    Sites(SitesArgs),
}

/// Arguments for the process command (main analysis)
#[derive(Debug, Clone, Parser)]
pub struct ProcessArgs {
    /// Input directory with the site list and series files
    ///
    /// Must contain species_list_location_dates.csv and one
    /// AGCD_met_{lat}_{lon}.csv file per distinct site coordinate.
    /// If not specified, defaults to ./input
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATH",
        help = "Input directory with the site list and series files"
    )]
    pub input_dir: Option<PathBuf>,

    /// Output directory for the result CSV files
    ///
    /// Will be created if it doesn't exist. If not specified, defaults
    /// to ./output
    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        help = "Output directory for the result CSV files"
    )]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// TOML configuration file for advanced settings. If not specified,
    /// looks for ~/.config/agcd-analyzer/config.toml
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Number of parallel workers
    ///
    /// Controls how many sites are analyzed concurrently. Defaults to the
    /// number of CPU cores, capped at 8.
    #[arg(
        short = 'j',
        long = "workers",
        value_name = "COUNT",
        help = "Number of parallel site-analysis workers"
    )]
    pub workers: Option<usize>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output format for the processing summary
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for the processing summary"
    )]
    pub output_format: OutputFormat,
}

/// Arguments for the sites command (site list inspection)
#[derive(Debug, Clone, Parser)]
pub struct SitesArgs {
    /// Input directory containing the site list
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATH",
        help = "Input directory containing the site list"
    )]
    pub input_dir: Option<PathBuf>,

    /// Output format for the site report
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for the site report"
    )]
    pub output_format: OutputFormat,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Output format options for machine-readable results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON format for scripting
    Json,
}

impl ProcessArgs {
    /// Validate argument combinations before processing starts.
    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(Error::configuration("--workers must be at least 1"));
        }
        if let Some(input) = &self.input_dir
            && !input.exists()
        {
            return Err(Error::configuration(format!(
                "input directory does not exist: {}",
                input.display()
            )));
        }
        Ok(())
    }

    /// Effective log level from the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        verbosity_level(self.verbose, self.quiet)
    }
}

impl SitesArgs {
    pub fn log_level(&self) -> &'static str {
        verbosity_level(self.verbose, self.quiet)
    }
}

fn verbosity_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
