//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::metadata::LinkPreviewFetcher;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    previews: LinkPreviewFetcher,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let previews = LinkPreviewFetcher::new(&config.metadata);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                previews,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the link preview fetcher
    pub fn previews(&self) -> &LinkPreviewFetcher {
        &self.inner.previews
    }
}
