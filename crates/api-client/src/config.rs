use std::time::Duration;

use crate::retry::RetryPolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:8081";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Sent as `X-Tenant-Domain` so public reads resolve to one storefront.
    pub tenant_domain: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            tenant_domain: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// `API_URL`, then `API_BASE_URL`, then the local default.
    pub fn from_env() -> Self {
        let base_url = ["API_URL", "API_BASE_URL"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(base_url)
    }

    pub fn with_tenant_domain(mut self, domain: impl Into<String>) -> Self {
        self.tenant_domain = Some(domain.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
