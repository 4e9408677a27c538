//! Backoff schedule for rate-limited requests.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; a request is sent at most `max_retries + 1` times.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// `base * 2^attempt` plus up to one `base` of jitter, capped at `max_delay`.
    /// A server-supplied `Retry-After` is a lower bound and may exceed the cap.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let exponential = base_ms.saturating_mul(1u64 << attempt.min(20));
        let jitter = if base_ms > 0 {
            rand::thread_rng().gen_range(0..base_ms)
        } else {
            0
        };
        let backoff = Duration::from_millis(exponential.saturating_add(jitter)).min(self.max_delay);
        match retry_after {
            Some(server) => server.max(backoff),
            None => backoff,
        }
    }
}

/// Parse `Retry-After` as delta-seconds or an HTTP-date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    // A date in the past means "now".
    Some(
        at.with_timezone(&Utc)
            .signed_duration_since(Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        }
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = policy();
        let first = policy.delay_for(0, None);
        assert!(first >= Duration::from_millis(100) && first < Duration::from_millis(200));
        let third = policy.delay_for(2, None);
        assert!(third >= Duration::from_millis(400) && third < Duration::from_millis(500));
        assert_eq!(policy.delay_for(8, None), Duration::from_millis(1000));
    }

    #[test]
    fn retry_after_is_a_lower_bound() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        let retry_after = parse_retry_after(&headers);
        assert_eq!(retry_after, Some(Duration::from_secs(2)));
        assert!(policy().delay_for(0, retry_after) >= Duration::from_millis(2000));
    }

    #[test]
    fn retry_after_accepts_http_dates() {
        let mut headers = HeaderMap::new();
        let at = (Utc::now() + chrono::Duration::seconds(30)).to_rfc2822();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(&at).unwrap());
        let delay = parse_retry_after(&headers).unwrap();
        assert!(delay > Duration::from_secs(25) && delay <= Duration::from_secs(30));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Sun, 06 Nov 1994 08:49:37 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), Some(Duration::ZERO));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);
    }
}
