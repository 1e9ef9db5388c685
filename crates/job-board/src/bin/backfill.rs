//! Backfill the numeric job url id for rows stored without one

use clap::Parser;
use std::path::PathBuf;

use job_board::{backfill, config::JobBoardConfig, logging, JobStore};

#[derive(Parser)]
#[command(name = "job-board-backfill", version, about = "Derive missing job url ids from posting URLs")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "JOB_BOARD_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Report what would change without writing
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init("job_board=info");

    let mut config = JobBoardConfig::load(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.database.path = database;
    }

    let store = JobStore::open(&config.database.path)?;
    let report = backfill::run(&store, args.dry_run)?;

    println!(
        "Scanned {}, updated {}, unmatched {}, failed {}{}",
        report.scanned,
        report.updated,
        report.unmatched,
        report.failed,
        if args.dry_run { " (dry run)" } else { "" }
    );

    Ok(())
}
