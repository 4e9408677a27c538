//! Per-client token bucket limiter
//!
//! Each client key gets a bucket holding up to a minute's allowance, refilled
//! continuously. Rejected requests get 429 with a `Retry-After` in seconds.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;

use crate::response::route_error;
use crate::state::AppState;

/// Idle buckets are dropped once per interval.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

struct Buckets {
    entries: HashMap<String, Bucket>,
    last_sweep: Instant,
}

pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    /// `None` for a limit of zero.
    pub fn per_minute(limit: u32) -> Option<Self> {
        if limit == 0 {
            return None;
        }
        Some(Self {
            capacity: limit as f64,
            refill_per_sec: limit as f64 / 60.0,
            buckets: Mutex::new(Buckets {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        })
    }

    /// Take one token for `key`, or report how long until one is available.
    pub async fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut buckets = self.buckets.lock().await;
        if now.saturating_duration_since(buckets.last_sweep) >= SWEEP_INTERVAL {
            self.sweep(&mut buckets.entries, now);
            buckets.last_sweep = now;
        }

        let bucket = buckets
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Bucket {
                tokens: self.capacity,
                last_refill: now,
            });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - bucket.tokens;
            Err(Duration::from_secs_f64(missing / self.refill_per_sec))
        }
    }

    /// Drop buckets that have refilled to capacity; a fresh bucket is identical.
    fn sweep(&self, entries: &mut HashMap<String, Bucket>, now: Instant) {
        let before = entries.len();
        entries.retain(|_, bucket| {
            let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens + elapsed * self.refill_per_sec < self.capacity
        });
        let dropped = before - entries.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} idle rate limit buckets", dropped);
        }
    }

    #[cfg(test)]
    async fn bucket_count(&self) -> usize {
        self.buckets.lock().await.entries.len()
    }
}

/// First `X-Forwarded-For` hop, if it looks like an address.
fn forwarded_for(req: &Request) -> Option<String> {
    let raw = req.headers().get("x-forwarded-for")?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() || first.len() > 64 {
        return None;
    }
    first
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b':' || b == b'-')
        .then(|| first.to_string())
}

/// Peer address, or the forwarded client when the proxy is trusted.
fn client_key(req: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(forwarded) = forwarded_for(req) {
            return forwarded;
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(limiter) = state.rate_limiter() else {
        return next.run(req).await;
    };
    let key = client_key(&req, state.config().trust_forwarded_for);
    match limiter.check(&key).await {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            let seconds = wait.as_secs_f64().ceil().max(1.0) as u64;
            tracing::warn!("Rate limited {} for {}s", key, seconds);
            let mut response =
                route_error(StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_disables() {
        assert!(RateLimiter::per_minute(0).is_none());
    }

    #[tokio::test]
    async fn bucket_empties_and_refills() {
        let limiter = RateLimiter::per_minute(2).unwrap();
        let start = Instant::now();

        assert!(limiter.check_at("a", start).await.is_ok());
        assert!(limiter.check_at("a", start).await.is_ok());
        let wait = limiter.check_at("a", start).await.unwrap_err();
        assert!(wait.as_secs_f64() > 29.0 && wait.as_secs_f64() < 30.5);

        // Other clients have their own bucket.
        assert!(limiter.check_at("b", start).await.is_ok());

        assert!(limiter
            .check_at("a", start + Duration::from_secs(31))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn idle_buckets_are_dropped() {
        let limiter = RateLimiter::per_minute(1).unwrap();
        let start = Instant::now();

        for n in 0..100 {
            assert!(limiter.check_at(&format!("10.0.0.{}", n), start).await.is_ok());
        }
        assert_eq!(limiter.bucket_count().await, 100);

        // Every bucket has refilled a minute later; only the caller remains.
        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("10.0.1.1", later).await.is_ok());
        assert_eq!(limiter.bucket_count().await, 1);
    }

    fn request_from(peer: [u8; 4], forwarded: &str) -> Request {
        let mut req = axum::http::Request::builder()
            .uri("/health")
            .header("x-forwarded-for", forwarded)
            .body(axum::body::Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 4000))));
        req
    }

    #[test]
    fn forwarded_for_needs_a_trusted_proxy() {
        let req = request_from([192, 0, 2, 7], "203.0.113.9, 10.0.0.1");
        assert_eq!(client_key(&req, false), "192.0.2.7");
        assert_eq!(client_key(&req, true), "203.0.113.9");

        let spoofed = request_from([192, 0, 2, 7], "<script>");
        assert_eq!(client_key(&spoofed, true), "192.0.2.7");
    }
}
