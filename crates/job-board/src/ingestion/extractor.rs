//! Posting extraction from rendered listing markup

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::config::SelectorConfig;
use crate::error::{Error, Result};
use crate::types::{extract_requirements, ScrapedPosting, SALARY_FALLBACK};

/// Turns the markup of one listing page into structured postings
pub trait PostingExtractor {
    fn extract(&self, html: &str) -> Result<Vec<ScrapedPosting>>;
}

/// Extractor driven by a set of CSS selectors
pub struct SelectorExtractor {
    base_url: Url,
    posting_anchor: Selector,
    item: Selector,
    title: Selector,
    department: Selector,
    location: Selector,
    job_type: Selector,
    description: Selector,
    salary: Option<Selector>,
}

impl SelectorExtractor {
    /// Compile the configured selectors
    pub fn new(config: &SelectorConfig, base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)
                .map_err(|e| Error::config(format!("Invalid base url '{}': {}", base_url, e)))?,
            posting_anchor: compile("posting_anchor", &config.posting_anchor)?,
            item: compile("item", &config.item)?,
            title: compile("title", &config.title)?,
            department: compile("department", &config.department)?,
            location: compile("location", &config.location)?,
            job_type: compile("job_type", &config.job_type)?,
            description: compile("description", &config.description)?,
            salary: config
                .salary
                .as_deref()
                .map(|s| compile("salary", s))
                .transpose()?,
        })
    }

    fn absolute_url(&self, href: &str) -> Option<String> {
        match self.base_url.join(href) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::warn!("Skipping posting with unusable link '{}': {}", href, e);
                None
            }
        }
    }

    fn extract_posting(&self, anchor: ElementRef<'_>) -> Option<ScrapedPosting> {
        let href = anchor.value().attr("href")?.trim();
        if href.is_empty() {
            return None;
        }

        // Fields live in a nested container; fall back to the anchor itself
        let scope = anchor.select(&self.item).next().unwrap_or(anchor);

        let description = all_text(scope, &self.description);
        let salary = self
            .salary
            .as_ref()
            .map(|selector| first_text(scope, selector))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| SALARY_FALLBACK.to_string());

        Some(ScrapedPosting {
            url: self.absolute_url(href)?,
            title: all_text(scope, &self.title),
            department: all_text(scope, &self.department),
            location: first_text(scope, &self.location),
            job_type: first_text(scope, &self.job_type),
            requirements: extract_requirements(&description),
            description,
            salary,
        })
    }
}

impl PostingExtractor for SelectorExtractor {
    fn extract(&self, html: &str) -> Result<Vec<ScrapedPosting>> {
        let document = Html::parse_document(html);

        let postings = document
            .select(&self.posting_anchor)
            .filter_map(|anchor| self.extract_posting(anchor))
            .collect();

        Ok(postings)
    }
}

fn compile(name: &str, selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| Error::config(format!("Invalid {} selector '{}': {:?}", name, selector, e)))
}

/// Text of every match, concatenated and trimmed
fn all_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Text of the first match, trimmed
fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Listing markup shaped like the default source site
    pub(crate) fn listing_html(ids: &[&str]) -> String {
        let items: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<a href="/experienced/position/{id}/detail" data-id="{id}">
                      <div class="positionItem__1giWi positionItem">
                        <div class="positionItem-title-text">职位 {id}</div>
                        <div class="subTitle__3sRa3"><span>北京</span><span>上海</span></div>
                        <span class="infoText__aS5hY">社招</span>
                        <span class="infoText__aS5hY">全职</span>
                        <span class="infoText-category__25NLe"><span class="content__3ZUKJ">研发 - 后端</span></span>
                        <div class="jobDesc__3ZDgU">职位描述
1、负责核心服务开发
2、参与系统设计
熟悉 Go 或 Rust</div>
                      </div>
                    </a>"#
                )
            })
            .collect();

        format!(
            "<html><body><div class=\"listItems\">{}</div></body></html>",
            items
        )
    }

    fn extractor() -> SelectorExtractor {
        SelectorExtractor::new(&SelectorConfig::default(), "https://jobs.bytedance.com").unwrap()
    }

    #[test]
    fn test_extract_listing() {
        let postings = extractor().extract(&listing_html(&["7001", "7002"])).unwrap();
        assert_eq!(postings.len(), 2);

        let first = &postings[0];
        assert_eq!(
            first.url,
            "https://jobs.bytedance.com/experienced/position/7001/detail"
        );
        assert_eq!(first.title, "职位 7001");
        assert_eq!(first.department, "研发 - 后端");
        assert_eq!(first.location, "北京");
        assert_eq!(first.job_type, "社招");
        assert_eq!(first.salary, SALARY_FALLBACK);
        assert!(first.description.starts_with("职位描述"));
        assert_eq!(
            first.requirements,
            vec!["1、负责核心服务开发", "2、参与系统设计"]
        );
    }

    #[test]
    fn test_empty_listing() {
        let postings = extractor()
            .extract("<html><body><p>暂无职位</p></body></html>")
            .unwrap();
        assert!(postings.is_empty());
    }

    #[test]
    fn test_anchor_without_item_container() {
        let html = r#"<a href="https://other.example/experienced/position/9/detail" data-id="9">
            <div class="positionItem-title-text">Standalone</div></a>
            <a href="/experienced/position/" data-id="x"></a>"#;
        let postings = extractor().extract(html).unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(
            postings[0].url,
            "https://other.example/experienced/position/9/detail"
        );
        assert_eq!(postings[0].title, "Standalone");
        assert_eq!(postings[1].title, "");
    }

    #[test]
    fn test_link_resolution() {
        let html = r#"<a href="//cdn.example/experienced/position/11/detail" data-id="11"></a>
            <a href="experienced/position/12/detail" data-id="12"></a>"#;
        let postings = extractor().extract(html).unwrap();
        assert_eq!(
            postings[0].url,
            "https://cdn.example/experienced/position/11/detail"
        );
        assert_eq!(
            postings[1].url,
            "https://jobs.bytedance.com/experienced/position/12/detail"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(SelectorExtractor::new(&SelectorConfig::default(), "not a url").is_err());
    }

    #[test]
    fn test_configured_salary_selector() {
        let config = SelectorConfig {
            salary: Some(".salary".to_string()),
            ..SelectorConfig::default()
        };
        let extractor = SelectorExtractor::new(&config, "https://jobs.bytedance.com").unwrap();
        let html = r#"<a href="/experienced/position/5/detail" data-id="5">
            <div class="positionItem__1giWi positionItem"><span class="salary"> 30-50K </span></div></a>"#;
        let postings = extractor.extract(html).unwrap();
        assert_eq!(postings[0].salary, "30-50K");
    }

    #[test]
    fn test_invalid_selector() {
        let config = SelectorConfig {
            posting_anchor: "a[".to_string(),
            ..SelectorConfig::default()
        };
        assert!(SelectorExtractor::new(&config, "https://x").is_err());
    }
}
