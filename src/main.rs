//! AGCD Analyzer
//!
//! Binary entry point. Parses the CLI, builds the async runtime, and
//! dispatches to the command layer.

use clap::{CommandFactory, Parser};

use agcd_analyzer::cli::args::Args;
use agcd_analyzer::cli::commands;

fn main() {
    let args = Args::parse();

    if args.command.is_none() {
        show_help_and_commands();
        return;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(commands::run(args)) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Print top-level help when invoked without a subcommand.
fn show_help_and_commands() {
    let mut command = Args::command();
    let _ = command.print_help();
    println!();
    println!("Run 'agcd-analyzer process' to analyze all sites in the site list,");
    println!("or 'agcd-analyzer sites' to validate the site list first.");
}
