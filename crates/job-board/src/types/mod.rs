//! Core types for the job board

pub mod category;
pub mod posting;

pub use category::Category;
pub use posting::{
    derive_tags, extract_job_url_id, extract_requirements, JobPosting, ScrapedPosting,
    UpsertOutcome, SALARY_FALLBACK,
};
