//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod classify;
mod init;
mod serve;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::filing::FilingMode;

#[derive(Parser)]
#[command(name = "gedsort")]
#[command(about = "Document classification and filing for scanned French documents")]
#[command(version)]
pub struct Cli {
    /// Config file (default: user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,

    /// Classify a single document and file it
    Classify {
        /// Document to process (pdf, docx or image)
        file: PathBuf,
        /// Copy into the output tree instead of moving
        #[arg(short, long)]
        keep: bool,
    },

    /// Classify every supported document in a directory
    Batch {
        /// Directory to scan (not recursive)
        dir: PathBuf,
        /// Copy into the output tree instead of moving
        #[arg(short, long)]
        keep: bool,
    },

    /// Show processing statistics
    Status,

    /// Start the HTTP classification API
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn filing_mode(keep: bool) -> FilingMode {
    if keep {
        FilingMode::Copy
    } else {
        FilingMode::Move
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings),
        Commands::Classify { file, keep } => {
            classify::cmd_classify(&settings, &file, filing_mode(keep)).await
        }
        Commands::Batch { dir, keep } => {
            classify::cmd_batch(&settings, &dir, filing_mode(keep)).await
        }
        Commands::Status => status::cmd_status(&settings),
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| settings.server.host.clone());
            let port = port.unwrap_or(settings.server.port);
            serve::cmd_serve(&settings, &host, port).await
        }
    }
}
