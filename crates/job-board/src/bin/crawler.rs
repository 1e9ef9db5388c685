//! Careers-site crawler
//!
//! Walks every configured category page by page and upserts the postings.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;

use job_board::{
    config::JobBoardConfig,
    ingestion::{fetcher_for, Crawler, SelectorExtractor},
    logging, JobStore,
};

#[derive(Parser)]
#[command(name = "job-board-crawler", version, about = "Crawl job postings into the store")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "JOB_BOARD_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Only crawl the named categories (repeatable)
    #[arg(long = "category", value_name = "NAME")]
    categories: Vec<String>,

    /// Override the per-category page cap
    #[arg(long)]
    max_pages: Option<usize>,

    /// Print the crawl report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init("job_board=info");

    let mut config = JobBoardConfig::load(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.database.path = database;
    }
    if let Some(max_pages) = args.max_pages {
        if max_pages == 0 {
            bail!("--max-pages must be at least 1");
        }
        config.crawler.max_pages = max_pages;
    }

    let categories = if args.categories.is_empty() {
        config.crawler.categories.clone()
    } else {
        let mut selected = Vec::new();
        for name in &args.categories {
            let category = config
                .crawler
                .categories
                .iter()
                .find(|c| &c.name == name)
                .with_context(|| format!("Unknown category: {}", name))?;
            selected.push(category.clone());
        }
        selected
    };

    tracing::info!(
        "Crawling {} categories, up to {} pages each, into {}",
        categories.len(),
        config.crawler.max_pages,
        config.database.path.display()
    );

    let report = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let mut store = JobStore::open(&config.database.path)?;
        let extractor =
            SelectorExtractor::new(&config.crawler.selectors, &config.crawler.source.base_url)?;
        let fetcher = fetcher_for(&config.crawler)?;

        let mut crawler = Crawler::new(config.crawler, fetcher, Box::new(extractor));
        Ok(crawler.run_categories(&mut store, &categories))
    })
    .await??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for category in &report.categories {
            println!(
                "{:<12} pages {:>3}  inserted {:>4}  updated {:>4}  skipped {:>3}  failed pages {:>2}",
                category.category,
                category.pages_fetched,
                category.inserted,
                category.updated,
                category.skipped,
                category.failed_pages
            );
        }
        println!(
            "\nSaved {} postings ({} failed pages)",
            report.saved(),
            report.failed_pages()
        );
    }

    Ok(())
}
