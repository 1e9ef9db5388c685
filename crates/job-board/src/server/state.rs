//! Application state for the job board server

use std::sync::Arc;

use crate::config::{FilterKey, JobBoardConfig};
use crate::error::Result;
use crate::storage::JobStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: JobBoardConfig,
}

impl AppState {
    /// Create new application state, making sure the store schema exists
    pub fn new(config: JobBoardConfig) -> Result<Self> {
        tracing::info!("Initializing job board state...");

        let store = JobStore::open(&config.database.path)?;
        tracing::info!(
            "Job store ready at {} ({} postings)",
            config.database.path.display(),
            store.count()?
        );
        drop(store);

        Ok(Self {
            inner: Arc::new(AppStateInner { config }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &JobBoardConfig {
        &self.inner.config
    }

    /// Column the list endpoint filters on
    pub fn filter_key(&self) -> FilterKey {
        self.inner.config.query.filter_key
    }

    /// Run `f` against a store connection opened for this call only.
    ///
    /// The connection lives on a blocking thread and is closed when `f`
    /// returns, whatever the outcome.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&JobStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.inner.config.database.path.clone();
        tokio::task::spawn_blocking(move || {
            let store = JobStore::connect(&path)?;
            f(&store)
        })
        .await?
    }

    /// Check if the store can be opened and read
    pub async fn is_ready(&self) -> bool {
        self.with_store(|store| store.count()).await.is_ok()
    }
}
