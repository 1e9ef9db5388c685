//! Job board query server
//!
//! Run with: cargo run -p job-board --bin job-board-server -- --config job-board.toml

use clap::Parser;
use std::path::PathBuf;

use job_board::{config::JobBoardConfig, logging, server::JobBoardServer};

#[derive(Parser)]
#[command(name = "job-board-server", version, about = "Serve crawled job postings as JSON")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "JOB_BOARD_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Bind host
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init("job_board=info,tower_http=debug");

    let mut config = JobBoardConfig::load(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.database.path = database;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Database: {}", config.database.path.display());
    tracing::info!("  - Filter key: {}", config.query.filter_key.param());
    tracing::info!("  - Fallback to full URL id: {}", config.query.fallback_to_id);

    let server = JobBoardServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
