//! Job posting record and the pure derivations applied at ingestion time

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Salary shown when the listing carries none ("negotiable")
pub const SALARY_FALLBACK: &str = "面议";

static JOB_URL_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/position/(\d+)/detail").expect("valid job url id pattern"));

// Numbered bullets, dashes, dots, asterisks, bracket/parenthesis openers.
// A dot after the number must not be followed by a digit ("3.5年" is prose).
static REQUIREMENT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+\s*(?:[、)）]|[.．](?:$|\D))|[-•·*]|[(（\[【])")
        .expect("valid requirement marker pattern")
});

/// A job posting as stored and served
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    /// Full source URL, immutable primary key
    pub id: String,
    /// Digits extracted from `id`, the externally exposed identifier
    pub job_url_id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub company_logo: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub tags: Vec<String>,
    /// Source URL, same value as `id`
    pub url: String,
    pub department: Option<String>,
    /// Name of the crawl category the posting was found under
    pub category: Option<String>,
    pub job_type: Option<String>,
    pub description: Option<String>,
    pub requirements: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields extracted from one posting anchor of a listing page
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ScrapedPosting {
    pub url: String,
    pub title: String,
    pub department: String,
    pub location: String,
    pub job_type: String,
    pub description: String,
    pub salary: String,
    pub requirements: Vec<String>,
}

/// Whether an upsert created a row or overwrote an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl JobPosting {
    /// Build the stored record for a scraped posting.
    ///
    /// Returns `None` when the URL carries no job url id; such postings are
    /// never persisted.
    pub fn from_scraped(
        scraped: ScrapedPosting,
        category: Option<&str>,
        company: &str,
        company_logo: &str,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let job_url_id = extract_job_url_id(&scraped.url)?;
        let department = non_empty(scraped.department);
        let job_type = non_empty(scraped.job_type);
        let tags = derive_tags(department.as_deref(), job_type.as_deref());

        Some(Self {
            id: scraped.url.clone(),
            job_url_id: Some(job_url_id),
            title: non_empty(scraped.title),
            company: non_empty(company.to_string()),
            company_logo: non_empty(company_logo.to_string()),
            location: non_empty(scraped.location),
            salary: non_empty(scraped.salary).or_else(|| Some(SALARY_FALLBACK.to_string())),
            tags,
            url: scraped.url,
            department,
            category: category.map(str::to_string).and_then(non_empty),
            job_type,
            description: non_empty(scraped.description),
            requirements: scraped.requirements,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Extract the numeric job id from a posting URL (`/position/<digits>/detail`)
pub fn extract_job_url_id(url: &str) -> Option<String> {
    JOB_URL_ID_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Tags are `[department, job_type]` with empty values dropped
pub fn derive_tags(department: Option<&str>, job_type: Option<&str>) -> Vec<String> {
    [department, job_type]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keep the description lines that start with an enumeration marker
pub fn extract_requirements(description: &str) -> Vec<String> {
    description
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && REQUIREMENT_MARKER.is_match(line))
        .map(str::to_string)
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
