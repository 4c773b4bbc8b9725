//! Local Goods CLI - favorites and recently viewed listings from the terminal
//!
//! Works offline against a local SQLite store and syncs with the Local Goods
//! backend once signed in.

mod auth;
mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::CliContext;
use crate::commands::config::run_config;
use crate::commands::favorites::run_favorite;
use crate::commands::reset::run_reset;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::views::run_view;
use crate::config::resolve_db_path;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "warn,localgoods=info,localgoods_core=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    if let Commands::Config { command } = cli.command {
        return run_config(command);
    }

    let db_path = resolve_db_path(cli.db_path).map_err(CliError::Config)?;
    let ctx = CliContext::open(&db_path).await?;

    match cli.command {
        Commands::Favorite { command } => run_favorite(command, &ctx).await,
        Commands::View { command } => run_view(command, &ctx).await,
        Commands::Sync => run_sync(&ctx).await,
        Commands::Status { json } => run_status(json, &ctx),
        Commands::Reset { yes } => run_reset(yes, &ctx),
        Commands::Auth { command } => run_auth(command, &ctx).await,
        // Handled before the store is opened
        Commands::Config { .. } => Ok(()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
