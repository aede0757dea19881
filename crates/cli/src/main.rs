//! reqcache command line entry point.
//!
//! Opens a cache session on the configured SQLite store and runs one
//! subcommand against it. Logging goes to stderr so bodies and JSON on
//! stdout stay clean.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reqcache_client::{HttpTransport, TransportConfig};
use reqcache_core::CachedSession;
use reqcache_core::config::AppConfig;

mod commands;
mod error;

#[derive(Parser, Debug)]
#[command(name = "reqcache")]
#[command(about = "Cache-aside HTTP client backed by SQLite")]
struct Args {
    /// Cache database path (overrides REQCACHE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Serve expired responses when the network fails
    #[arg(long, global = true)]
    stale_if_error: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: commands::Command,
}

fn init_logging(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let mut config = AppConfig::load().context("loading configuration")?;
    if let Some(db) = args.db {
        config.db_path = db;
    }
    if args.stale_if_error {
        config.stale_if_error = true;
    }

    tracing::debug!(db = %config.db_path.display(), "opening cache session");

    let transport = HttpTransport::new(TransportConfig::from(&config))?;
    let session = CachedSession::open(&config.db_path, config.cache_settings(), transport)
        .with_context(|| format!("opening cache at {}", config.db_path.display()))?;

    let stdout = std::io::stdout();
    commands::run(&session, args.command, &mut stdout.lock())?;

    Ok(())
}
