//! Response cache that lives as long as the client.
//!
//! Entries never expire and are never invalidated; storefront content such as
//! hero banners and category lists is fetched once per session.

use std::collections::HashMap;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};

#[derive(Debug, Default)]
pub struct SessionCache {
    entries: RwLock<HashMap<String, Value>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().await;
        let value = entries.get(key)?.clone();
        serde_json::from_value(value).ok()
    }

    pub async fn insert<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(ApiError::decode)?;
        self.entries.write().await.insert(key.into(), value);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result.
    pub async fn cached<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.get(key).await {
            debug!("Cache hit: {}", key);
            return Ok(hit);
        }
        let value = fetch().await?;
        self.insert(key, &value).await?;
        Ok(value)
    }

    /// Like [`SessionCache::cached`], degrading to `fallback` on failure.
    ///
    /// The fallback is not cached, so the next call tries the server again.
    pub async fn cached_or<T, F, Fut>(&self, key: &str, fetch: F, fallback: T) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.cached(key, fetch).await {
            Ok(value) => value,
            Err(err) => {
                warn!("Using fallback for {}: {}", key, err);
                fallback
            }
        }
    }
}
