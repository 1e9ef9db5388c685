//! Sequential crawl of every category, page by page, into the posting store

use chrono::Utc;
use serde::Serialize;
use std::time::Duration;

use super::extractor::PostingExtractor;
use super::fetcher::PageFetcher;
use crate::config::CrawlerConfig;
use crate::storage::JobStore;
use crate::types::{Category, JobPosting, ScrapedPosting, UpsertOutcome};

/// What one listing page yielded
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Postings were found
    Postings(Vec<ScrapedPosting>),
    /// The page rendered with no postings
    Empty,
    /// Fetching or parsing failed
    Failed(String),
}

/// Counters for one category
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: String,
    pub pages_fetched: usize,
    pub empty_pages: usize,
    pub failed_pages: usize,
    pub postings_seen: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Postings whose URL carries no job url id
    pub skipped: usize,
    /// Postings the store rejected
    pub failed: usize,
}

/// Result of a crawl run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub categories: Vec<CategoryReport>,
}

impl CrawlReport {
    /// Postings written, inserted or updated
    pub fn saved(&self) -> usize {
        self.categories.iter().map(|c| c.inserted + c.updated).sum()
    }

    pub fn failed_pages(&self) -> usize {
        self.categories.iter().map(|c| c.failed_pages).sum()
    }
}

/// Walks categories and pages, extracting and upserting postings
pub struct Crawler {
    config: CrawlerConfig,
    fetcher: Box<dyn PageFetcher>,
    extractor: Box<dyn PostingExtractor>,
}

impl Crawler {
    pub fn new(
        config: CrawlerConfig,
        fetcher: Box<dyn PageFetcher>,
        extractor: Box<dyn PostingExtractor>,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
        }
    }

    /// Crawl every configured category
    pub fn run(&mut self, store: &mut JobStore) -> CrawlReport {
        let categories = self.config.categories.clone();
        self.run_categories(store, &categories)
    }

    /// Crawl the given categories in order
    pub fn run_categories(&mut self, store: &mut JobStore, categories: &[Category]) -> CrawlReport {
        let mut report = CrawlReport::default();

        for (index, category) in categories.iter().enumerate() {
            if index > 0 {
                pause(self.config.category_delay());
            }

            tracing::info!("Crawling category {} ({})", category.name, category.code);
            let category_report = self.crawl_category(store, category);
            tracing::info!(
                "Finished {}: {} pages, {} inserted, {} updated, {} skipped, {} failed pages",
                category.name,
                category_report.pages_fetched,
                category_report.inserted,
                category_report.updated,
                category_report.skipped,
                category_report.failed_pages
            );
            report.categories.push(category_report);
        }

        report
    }

    fn crawl_category(&mut self, store: &mut JobStore, category: &Category) -> CategoryReport {
        let mut report = CategoryReport {
            category: category.name.clone(),
            ..Default::default()
        };
        let mut consecutive_empty = 0;

        for page in 1..=self.config.max_pages {
            if page > 1 {
                pause(self.config.page_delay());
            }

            let url = self
                .config
                .source
                .listing_url(&category.code, page, self.config.page_size);

            match self.fetch_page(&url) {
                PageOutcome::Postings(postings) => {
                    tracing::info!("Page {} of {}: {} postings", page, category.name, postings.len());
                    report.pages_fetched += 1;
                    consecutive_empty = 0;
                    self.persist(store, category, postings, &mut report);
                }
                PageOutcome::Empty => {
                    report.pages_fetched += 1;
                    report.empty_pages += 1;
                    consecutive_empty += 1;
                    if consecutive_empty > self.config.max_empty_pages {
                        tracing::info!("No more postings for {} after page {}", category.name, page);
                        break;
                    }
                    tracing::warn!("Page {} of {} is empty, trying the next one", page, category.name);
                }
                PageOutcome::Failed(reason) => {
                    report.failed_pages += 1;
                    tracing::error!("Giving up on page {} of {}: {}", page, category.name, reason);
                }
            }
        }

        report
    }

    /// Fetch and classify one page, retrying failures
    fn fetch_page(&mut self, url: &str) -> PageOutcome {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url) {
                PageOutcome::Failed(reason) if attempt < self.config.max_page_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Fetching {} failed ({}), retry {}/{}",
                        url,
                        reason,
                        attempt,
                        self.config.max_page_retries
                    );
                    pause(self.config.retry_delay());
                }
                outcome => return outcome,
            }
        }
    }

    fn fetch_once(&mut self, url: &str) -> PageOutcome {
        let html = match self.fetcher.fetch(url) {
            Ok(html) => html,
            Err(e) => return PageOutcome::Failed(e.to_string()),
        };

        match self.extractor.extract(&html) {
            Ok(postings) if postings.is_empty() => PageOutcome::Empty,
            Ok(postings) => PageOutcome::Postings(postings),
            Err(e) => PageOutcome::Failed(e.to_string()),
        }
    }

    fn persist(
        &self,
        store: &mut JobStore,
        category: &Category,
        postings: Vec<ScrapedPosting>,
        report: &mut CategoryReport,
    ) {
        let source = &self.config.source;

        for scraped in postings {
            report.postings_seen += 1;
            let url = scraped.url.clone();

            let Some(posting) = JobPosting::from_scraped(
                scraped,
                Some(&category.name),
                &source.company,
                &source.company_logo,
                Utc::now(),
            ) else {
                tracing::warn!("Skipping posting, no job url id in {}", url);
                report.skipped += 1;
                continue;
            };

            match store.upsert(&posting) {
                Ok(UpsertOutcome::Inserted) => {
                    report.inserted += 1;
                    tracing::debug!("Saved {:?} ({})", posting.title, posting.id);
                }
                Ok(UpsertOutcome::Updated) => {
                    report.updated += 1;
                    tracing::debug!("Updated {:?} ({})", posting.title, posting.id);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("Failed to save posting {}: {} ({:?})", posting.id, e, posting);
                }
            }
        }
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
