//! Listing page fetchers

use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CrawlerConfig, FetcherKind};
use crate::error::{Error, Result};

/// Fetches the fully rendered markup of a listing page
pub trait PageFetcher {
    fn fetch(&mut self, url: &str) -> Result<String>;
}

/// Build the fetcher selected by the crawler configuration
pub fn fetcher_for(config: &CrawlerConfig) -> Result<Box<dyn PageFetcher>> {
    Ok(match config.fetcher {
        FetcherKind::Chrome => Box::new(ChromeFetcher::launch(config)?),
        FetcherKind::Http => Box::new(HttpFetcher::new(config)?),
    })
}

/// One headless Chrome tab reused for every page
pub struct ChromeFetcher {
    tab: Arc<Tab>,
    // Dropping the browser kills the Chrome process
    _browser: Browser,
    ready_selector: String,
    selector_timeout: Duration,
    settle_delay: Duration,
}

impl ChromeFetcher {
    /// Launch Chrome and open the tab
    pub fn launch(config: &CrawlerConfig) -> Result<Self> {
        let user_agent = OsString::from(format!("--user-agent={}", config.user_agent));
        let no_automation = OsString::from("--disable-blink-features=AutomationControlled");

        let browser = Browser::new(LaunchOptions {
            headless: config.headless,
            args: vec![user_agent.as_os_str(), no_automation.as_os_str()],
            idle_browser_timeout: config.selector_timeout() + Duration::from_secs(60),
            ..Default::default()
        })
        .map_err(|e| Error::browser(format!("Failed to launch Chrome: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::browser(format!("Failed to open tab: {}", e)))?;

        tracing::info!("Chrome launched (headless: {})", config.headless);

        Ok(Self {
            tab,
            _browser: browser,
            ready_selector: config.selectors.posting_anchor.clone(),
            selector_timeout: config.selector_timeout(),
            settle_delay: config.settle_delay(),
        })
    }
}

impl PageFetcher for ChromeFetcher {
    fn fetch(&mut self, url: &str) -> Result<String> {
        tracing::debug!("Navigating to {}", url);
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| Error::browser(format!("Navigation to {} failed: {}", url, e)))?;

        // A listing that never shows postings is an empty page, not a failure
        match self
            .tab
            .wait_for_element_with_custom_timeout(&self.ready_selector, self.selector_timeout)
        {
            Ok(_) => tracing::debug!("Posting list rendered"),
            Err(e) => tracing::debug!("No postings appeared on {}: {}", url, e),
        }

        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }

        self.tab
            .get_content()
            .map_err(|e| Error::browser(format!("Failed to read page content: {}", e)))
    }
}

/// Plain HTTP fetcher for server-rendered listings
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.selector_timeout())
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&mut self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);
        let body = self.client.get(url).send()?.error_for_status()?.text()?;
        Ok(body)
    }
}
