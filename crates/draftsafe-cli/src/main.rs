//! draftsafe maintenance CLI.
//!
//! Binary name: `dsafe`
//!
//! Opens the persistent auto-save store in the data directory and runs one
//! inspection or maintenance command against it.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use draftsafe_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::{AppState, key_source_from_flags};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,draftsafe=debug",
        _ => "trace",
    };
    init_tracing(&TracingOptions {
        default_filter: default_filter.to_string(),
        json: cli.log_json,
        enable_otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need the store
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "dsafe", &mut std::io::stdout());
        return Ok(());
    }

    let key_source = key_source_from_flags(cli.passphrase_env.as_deref(), cli.keychain)?;
    let state = AppState::init(cli.data_dir.clone(), key_source).await?;

    let result = match cli.command {
        Commands::List { path } => cli::entries::list_entries(&state, path.as_deref(), cli.json).await,
        Commands::Show { id } => cli::entries::show_entry(&state, &id, cli.json).await,
        Commands::Clear { id, all, yes } => {
            cli::entries::clear_entries(&state, id.as_deref(), all, yes, cli.json).await
        }
        Commands::Export { out } => cli::storage::export_store(&state, out.as_deref(), cli.json).await,
        Commands::Import { file } => cli::storage::import_store(&state, &file, cli.json).await,
        Commands::Purge => cli::storage::purge_store(&state, cli.json).await,
        Commands::Stats => cli::storage::stats(&state, cli.json).await,
        Commands::Completions { .. } => Ok(()),
    };

    shutdown_tracing();
    result
}
