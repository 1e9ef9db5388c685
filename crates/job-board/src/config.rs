//! Configuration for the job board

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::ingestion::SelectorExtractor;
use crate::types::category::{default_categories, Category};

/// Main job board configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobBoardConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Posting store configuration
    pub database: DatabaseConfig,
    /// Crawler configuration
    pub crawler: CrawlerConfig,
    /// Query endpoint configuration
    pub query: QueryConfig,
}

impl JobBoardConfig {
    /// Load configuration from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                let config: Self = toml::from_str(&raw)?;
                tracing::info!("Loaded configuration from {}", path.display());
                config
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the crawler or server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.crawler.categories.is_empty() {
            return Err(Error::config("crawler.categories must not be empty"));
        }
        if let Some(category) = self
            .crawler
            .categories
            .iter()
            .find(|c| c.name.trim().is_empty() || c.code.trim().is_empty())
        {
            return Err(Error::config(format!(
                "category entries need a name and a code, got {:?}",
                category
            )));
        }
        if self.crawler.max_pages == 0 {
            return Err(Error::config("crawler.max_pages must be at least 1"));
        }
        if !self.crawler.source.listing_url_template.contains("{page}") {
            return Err(Error::config(
                "crawler.source.listing_url_template must contain {page}",
            ));
        }
        SelectorExtractor::new(&self.crawler.selectors, &self.crawler.source.base_url)?;
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Posting store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("job-board")
            .join("jobs.db");

        Self { path }
    }
}

/// How listing pages are fetched
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Headless Chrome, for client-rendered listings
    #[default]
    Chrome,
    /// Plain HTTP GET, for server-rendered listings
    Http,
}

/// The careers site being crawled
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSiteConfig {
    /// Site origin, prepended to relative posting links
    pub base_url: String,
    /// Listing URL with `{base_url}`, `{category}`, `{page}` and `{limit}` placeholders
    pub listing_url_template: String,
    /// Company stored on postings created from this site
    pub company: String,
    /// Logo path stored on postings created from this site
    pub company_logo: String,
}

impl Default for SourceSiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://jobs.bytedance.com".to_string(),
            listing_url_template: "{base_url}/experienced/position?keywords=&category={category}\
                &location=&project=&type=&job_hot_flag=&current={page}&limit={limit}\
                &functionCategory=&tag="
                .to_string(),
            company: "ByteDance".to_string(),
            company_logo: "/images/bytedance.svg".to_string(),
        }
    }
}

impl SourceSiteConfig {
    /// Listing URL for one category code and 1-based page number
    pub fn listing_url(&self, category_code: &str, page: usize, limit: usize) -> String {
        self.listing_url_template
            .replace("{base_url}", self.base_url.trim_end_matches('/'))
            .replace("{category}", category_code)
            .replace("{page}", &page.to_string())
            .replace("{limit}", &limit.to_string())
    }
}

/// CSS selectors used to pull postings out of a listing page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One anchor per posting, carrying the posting link in `href`
    pub posting_anchor: String,
    /// Container inside the anchor holding the fields
    pub item: String,
    pub title: String,
    pub department: String,
    /// First match is used
    pub location: String,
    /// First match is used
    pub job_type: String,
    pub description: String,
    /// The default site shows no salary on listings
    pub salary: Option<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            posting_anchor: r#"a[href*="/experienced/position/"][data-id]"#.to_string(),
            item: ".positionItem__1giWi.positionItem".to_string(),
            title: ".positionItem-title-text".to_string(),
            department: ".infoText-category__25NLe .content__3ZUKJ".to_string(),
            location: ".subTitle__3sRa3 span".to_string(),
            job_type: ".infoText__aS5hY".to_string(),
            description: ".jobDesc__3ZDgU".to_string(),
            salary: None,
        }
    }
}

/// Crawler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    pub source: SourceSiteConfig,
    /// Category table, also served by `GET /api/categories`
    pub categories: Vec<Category>,
    /// Hard page cap per category
    pub max_pages: usize,
    /// Postings requested per listing page
    pub page_size: usize,
    /// Consecutive empty pages tolerated before a category counts as exhausted
    pub max_empty_pages: usize,
    /// Retries for a page whose fetch failed
    pub max_page_retries: usize,
    pub retry_delay_ms: u64,
    /// Pause between pages
    pub page_delay_ms: u64,
    /// Random extra pause between pages, up to this many milliseconds
    pub page_jitter_ms: u64,
    /// Pause between categories
    pub category_delay_ms: u64,
    /// Wait after the listing appears so client-side rendering can finish
    pub settle_delay_ms: u64,
    /// Bound on waiting for the posting anchors to appear
    pub selector_timeout_secs: u64,
    pub fetcher: FetcherKind,
    /// Run Chrome without a window
    pub headless: bool,
    pub user_agent: String,
    pub selectors: SelectorConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            source: SourceSiteConfig::default(),
            categories: default_categories(),
            max_pages: 10,
            page_size: 10,
            max_empty_pages: 1,
            max_page_retries: 2,
            retry_delay_ms: 5_000,
            page_delay_ms: 2_000,
            page_jitter_ms: 1_000,
            category_delay_ms: 5_000,
            settle_delay_ms: 3_000,
            selector_timeout_secs: 60,
            fetcher: FetcherKind::Chrome,
            headless: true,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl CrawlerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn category_delay(&self) -> Duration {
        Duration::from_millis(self.category_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }

    /// Inter-page pause with jitter applied
    pub fn page_delay(&self) -> Duration {
        use rand::Rng;

        let jitter = if self.page_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.page_jitter_ms)
        };
        Duration::from_millis(self.page_delay_ms + jitter)
    }

    /// Config with every pause set to zero
    pub fn without_delays(mut self) -> Self {
        self.retry_delay_ms = 0;
        self.page_delay_ms = 0;
        self.page_jitter_ms = 0;
        self.category_delay_ms = 0;
        self.settle_delay_ms = 0;
        self
    }
}

/// Column the list endpoint filters on, and the query parameter carrying it
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterKey {
    #[default]
    Department,
    Category,
}

impl FilterKey {
    /// Query parameter name
    pub fn param(&self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Category => "category",
        }
    }

    /// Column name in the `jobs` table
    pub fn column(&self) -> &'static str {
        // Same spelling as the parameter for both keys
        self.param()
    }
}

/// Query endpoint configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub filter_key: FilterKey,
    /// Match `GET /api/jobs/:id` against the full URL when no job url id matches
    pub fallback_to_id: bool,
}
