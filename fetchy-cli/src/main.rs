//! Fetchy CLI - Command-line interface
//!
//! This binary provides a command-line interface to the fetchy library.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::download::DownloadArgs;
use error::CliError;

/// Segmented HTTP downloader.
#[derive(Debug, Parser)]
#[command(name = "fetchy", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download a file over parallel connections
    Download {
        /// URL to download
        url: String,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of parallel connections
        #[arg(short, long, default_value_t = 4)]
        threads: usize,

        /// Only print errors and warnings
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show file information without downloading
    Info {
        /// URL to check
        url: String,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Download {
            url,
            output,
            threads,
            quiet,
        } => commands::download::run(DownloadArgs {
            url,
            output,
            threads,
            quiet,
        }),
        Commands::Info { url } => commands::info::run(&url),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
