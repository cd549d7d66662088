//! Introspect CLI - Type metadata generation for C-family headers
//!
//! Scans a directory of headers, builds a symbol table per file and writes
//! `EnumTrait` / `ClassTrait` specializations for the types it finds.
//!
//! # Usage
//!
//! ```bash
//! # Generate metadata.h / metadata.cpp for the current directory
//! introspect generate
//!
//! # Only tagged enums, into a separate directory
//! introspect generate include --emit enums --tagged-only -o generated
//!
//! # Inspect the scope tree of one header
//! introspect dump include/widgets.h --json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use introspect_config::{LogFormat, LoggingConfig};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod progress;

/// Introspect - Generate type metadata from C-family headers
#[derive(Parser, Debug)]
#[command(name = "introspect")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "INTROSPECT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse headers and write the generated metadata files
    Generate(commands::generate::GenerateArgs),

    /// Print the scope tree and diagnostics of a single header
    Dump(commands::dump::DumpArgs),

    /// Remove the symbol table cache
    Clean(commands::clean::CleanArgs),
}

/// Install the global subscriber. `--quiet` and `--verbose` win over the
/// configured level.
fn init_logging(global: &GlobalOptions, logging: &LoggingConfig) -> Result<()> {
    let log_level = if global.quiet {
        Level::ERROR
    } else if global.verbose {
        Level::DEBUG
    } else {
        logging.level.parse().unwrap_or(Level::INFO)
    };

    match logging.format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, cli.global),
        Commands::Dump(args) => commands::dump::execute(args, cli.global),
        Commands::Clean(args) => commands::clean::execute(args, cli.global),
    }
}
