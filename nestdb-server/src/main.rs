//! nestdb server process
//!
//! Wires configuration, logging, the store and the TCP server together.
//! The server shuts down gracefully when a client sends an `exit` request;
//! Ctrl+C is handled as deployment glue and stops the process without a
//! drain.

use anyhow::Result;
use clap::Parser;
use nestdb_core::Store;
use nestdb_server::Server;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nestdb-server")]
#[command(about = "In-memory JSON document database server")]
#[command(version)]
struct Args {
    /// TCP bind address
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// TCP port
    #[arg(short = 'p', long, default_value = "15000")]
    port: u16,

    /// Database file path
    #[arg(short = 'f', long, default_value = "./data/db.json")]
    db_path: PathBuf,

    /// Worker pool size
    #[arg(short = 'w', long, default_value = "5")]
    workers: usize,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    let env_filter = EnvFilter::new(format!(
        "nestdb_server={},nestdb_core={}",
        log_level, log_level
    ));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!("nestdb server starting");
    info!("  database file: {}", args.db_path.display());
    info!("  listen address: {}:{}", args.host, args.port);
    info!("  worker pool: {}", args.workers);

    let store = Arc::new(Store::open(&args.db_path)?);
    let server = Server::bind((args.host.as_str(), args.port), store, args.workers).await?;

    tokio::select! {
        result = server.run() => {
            result?;
            info!("server drained after exit request");
        }
        _ = signal::ctrl_c() => {
            info!("interrupt received, stopping");
        }
    }

    Ok(())
}
