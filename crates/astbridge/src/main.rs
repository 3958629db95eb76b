//! Astbridge CLI - Inspect syntax trees produced by an external parser.
//!
//! Astbridge runs the parser named in `astbridge.yaml` on a source file and
//! prints the resulting tree, selected statements, or the parser's status.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

/// Astbridge: syntax trees from external parsers.
#[derive(Parser)]
#[command(name = "astbridge")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Parser configuration file
    #[arg(short, long, global = true, default_value = astbridge::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the syntax tree of a source file
    Tree {
        /// Source file to parse
        file: PathBuf,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the nodes of one kind in a source file
    Select {
        /// Source file to parse
        file: PathBuf,

        /// Node kind name (e.g., "`n_STATEMENT`")
        #[arg(short, long)]
        kind: String,
    },

    /// Check that the parser is installed and up to date
    Check,

    /// List the node and token kinds of the configured grammar
    Kinds,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Tree { file, json } => cli::tree::run(&cli.config, &file, json),
        Commands::Select { file, kind } => cli::select::run(&cli.config, &file, &kind),
        Commands::Check => cli::check::run(&cli.config),
        Commands::Kinds => cli::kinds::run(&cli.config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            for cause in e.chain().skip(1) {
                eprintln!("  {}: {cause}", "caused by".dimmed());
            }
            ExitCode::FAILURE
        }
    }
}
