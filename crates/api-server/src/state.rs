//! Application state

use std::sync::Arc;

use voyage_core::Database;

use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Database,
    config: ServerConfig,
    rate_limiter: Option<RateLimiter>,
}

impl AppState {
    /// Open the data directory named in `config`.
    pub async fn new(config: ServerConfig) -> voyage_core::Result<Self> {
        let db = Database::open(&config.data_dir).await?;
        Ok(Self::with_database(db, config))
    }

    pub fn with_database(db: Database, config: ServerConfig) -> Self {
        let rate_limiter = RateLimiter::per_minute(config.rate_limit_per_minute);
        Self {
            inner: Arc::new(AppStateInner {
                db,
                config,
                rate_limiter,
            }),
        }
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// `None` when limiting is disabled.
    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.inner.rate_limiter.as_ref()
    }
}
