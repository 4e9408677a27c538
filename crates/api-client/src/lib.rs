//! Typed client for the Voyage REST API
//!
//! Wraps `reqwest` with the behaviour the storefronts rely on:
//! - retry with exponential backoff and jitter when the server answers 429
//! - deduplication of identical GET requests that are still in flight
//! - a process-lifetime response cache with static fallbacks
//! - typed helpers per resource, unwrapping the `{success, data, message}` envelope

mod cache;
mod client;
mod config;
mod error;
mod resources;
mod retry;

pub use cache::SessionCache;
pub use client::{ApiClient, TENANT_DOMAIN_HEADER};
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use resources::{
    AuthApi, AuthSession, BookingsApi, CatalogApi, CategoriesApi, DeparturesApi, HeroApi,
    Profile, TenantsApi,
};
pub use retry::{parse_retry_after, RetryPolicy};
