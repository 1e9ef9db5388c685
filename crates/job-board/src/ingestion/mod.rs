//! Careers-site ingestion: fetch listing pages, extract postings, upsert them

pub mod extractor;
pub mod fetcher;
pub mod pipeline;

pub use extractor::{PostingExtractor, SelectorExtractor};
pub use fetcher::{fetcher_for, ChromeFetcher, HttpFetcher, PageFetcher};
pub use pipeline::{CategoryReport, CrawlReport, Crawler, PageOutcome};
