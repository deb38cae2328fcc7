//! Per-host request spacing.
//!
//! Publisher sites are quick to block clients that hammer them, so requests
//! to the same host are spaced at least `delay` apart. Different hosts never
//! wait on each other.
//!
//! ```
//! use std::time::Duration;
//! use grabber_core::fetch::RateLimiter;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(Duration::from_millis(500));
//! limiter.acquire("https://bmcvetres.biomedcentral.com/articles/1").await;
//! limiter.acquire("https://bmcvetres.biomedcentral.com/articles/2").await; // ~500ms later
//! limiter.acquire("https://journals.plos.org/plosone/article?id=1").await; // immediate
//! # }
//! ```

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Queueing more than this far ahead for one host is worth a warning.
const BACKLOG_WARNING: Duration = Duration::from_secs(30);

/// Hands out request slots per host.
///
/// Each call reserves the next free slot for its host and sleeps until it,
/// so concurrent workers targeting one host are serialized without holding
/// a lock while they wait.
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    /// Earliest instant the next request to each host may start.
    next_slot: DashMap<String, Instant>,
}

impl RateLimiter {
    /// Limiter spacing same-host requests by `delay`; zero disables it.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: DashMap::new(),
        }
    }

    /// Limiter that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.delay.is_zero()
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits for this request's slot on `url`'s host.
    #[instrument(skip(self), fields(host))]
    pub async fn acquire(&self, url: &str) {
        if self.is_disabled() {
            return;
        }

        let host = extract_host(url);
        tracing::Span::current().record("host", host.as_str());

        let now = Instant::now();
        let slot = {
            let mut next = self.next_slot.entry(host).or_insert(now);
            let slot = (*next).max(now);
            *next = slot + self.delay;
            slot
        };

        let wait = slot.saturating_duration_since(now);
        if wait.is_zero() {
            return;
        }
        if wait >= BACKLOG_WARNING {
            warn!(
                wait_secs = wait.as_secs(),
                "Long per-host backlog; lower concurrency or the rate limit"
            );
        } else {
            debug!(wait_ms = wait.as_millis(), "Waiting for host slot");
        }
        tokio::time::sleep_until(slot).await;
    }
}

/// Lowercased host of `url`; unparseable URLs share the `"unknown"` bucket.
///
/// ```
/// use grabber_core::fetch::rate_limiter::extract_host;
///
/// assert_eq!(extract_host("https://Link.Springer.com/article/1"), "link.springer.com");
/// assert_eq!(extract_host("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_zero_delay_means_disabled() {
        assert!(RateLimiter::new(Duration::ZERO).is_disabled());
        assert!(RateLimiter::disabled().is_disabled());
        assert!(!RateLimiter::new(Duration::from_millis(1)).is_disabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_host_requests_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        let start = Instant::now();

        limiter.acquire("https://www.hindawi.com/a").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        limiter.acquire("https://www.hindawi.com/b").await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_hosts_do_not_wait() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        limiter.acquire("https://www.hindawi.com/a").await;

        let start = Instant::now();
        limiter.acquire("https://www.frontiersin.org/a").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_get_consecutive_slots() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
        let start = Instant::now();

        let tasks: Vec<_> = (0..3)
            .map(|i| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire(&format!("https://cdc.gov/{i}")).await;
                    start.elapsed()
                })
            })
            .collect();
        let mut waits = Vec::new();
        for task in tasks {
            waits.push(task.await.unwrap_or_default());
        }
        waits.sort();

        assert_eq!(waits[0], Duration::ZERO);
        assert!(waits[1] >= Duration::from_secs(1));
        assert!(waits[2] >= Duration::from_secs(2));
    }

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host("http://Example.COM/Path"), "example.com");
        assert_eq!(extract_host("https://127.0.0.1:8080/x"), "127.0.0.1");
        assert_eq!(extract_host(""), "unknown");
    }
}
