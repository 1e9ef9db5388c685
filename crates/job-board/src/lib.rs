//! job-board: job-listing backend
//!
//! A careers-site crawler that upserts postings into SQLite, a backfill for
//! the numeric job url id, and a read-only JSON query service over the store.

pub mod backfill;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod logging;
pub mod server;
pub mod storage;
pub mod types;

pub use config::JobBoardConfig;
pub use error::{Error, Result};
pub use storage::JobStore;
pub use types::{Category, JobPosting, ScrapedPosting};
