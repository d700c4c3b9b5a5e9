//! CLI command definitions for the `dsafe` binary.

pub mod entries;
pub mod storage;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Inspect and maintain a draftsafe auto-save store.
#[derive(Parser)]
#[command(name = "dsafe", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Data directory (defaults to DRAFTSAFE_DATA_DIR or ~/.draftsafe).
    #[arg(long, global = true, env = "DRAFTSAFE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Name of an environment variable holding the encryption passphrase.
    #[arg(long, global = true, conflicts_with = "keychain")]
    pub passphrase_env: Option<String>,

    /// Use the encryption key kept in the OS keychain.
    #[arg(long, global = true)]
    pub keychain: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List saved entries, newest first.
    #[command(alias = "ls")]
    List {
        /// Only entries saved under this path.
        #[arg(long)]
        path: Option<String>,
    },

    /// Show one entry including its content.
    Show {
        /// Entry id.
        id: String,
    },

    /// Delete saved entries.
    #[command(alias = "rm")]
    Clear {
        /// Entry id to delete.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Delete every entry in the namespace.
        #[arg(long)]
        all: bool,

        /// Required with --all.
        #[arg(long)]
        yes: bool,
    },

    /// Write every stored value to a JSON export.
    Export {
        /// Output file (stdout when omitted).
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Load values from a JSON export.
    Import {
        /// Export file to read.
        file: PathBuf,
    },

    /// Remove expired and unreadable values.
    Purge,

    /// Store statistics.
    Stats,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Format byte counts for display.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
