//! Crawl categories shared by the crawler and the category endpoint

use serde::{Deserialize, Serialize};

/// One entry of the category table: display name and the source site's code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    /// Display name, stored on each posting as its `category`
    pub name: String,
    /// Opaque code passed to the listing URL
    pub code: String,
}

impl Category {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// Categories known to be valid on the default source site
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("后端", "6704215862557018372"),
        Category::new("前端", "6704215886108035339"),
    ]
}
