use std::collections::HashMap;

use tokio::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_actions: u32,
    pub window: Duration,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub window_secs: u64,
    pub retry_after_secs: u64,
}

/// Sliding-window limiter keyed by action identifier. Each key holds the
/// timestamps of admitted actions within the window; stale entries are
/// pruned lazily on the next check for that key. Safe only under one
/// logical thread of control; the HTTP surface guards it with a mutex.
#[derive(Debug)]
pub struct ActionRateLimiter {
    config: RateLimitConfig,
    windows: HashMap<String, Vec<Instant>>,
}

impl ActionRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
        }
    }

    /// Admit or reject one action for `key`. Admitting records the action
    /// against the current window.
    pub fn check(&mut self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let window = self.config.window;
        let hits = self.windows.entry(key.to_string()).or_default();

        hits.retain(|t| now.duration_since(*t) < window);

        let limit = self.config.max_actions;
        if (hits.len() as u32) < limit {
            hits.push(now);
            RateLimitDecision {
                allowed: true,
                limit,
                remaining: limit - hits.len() as u32,
                window_secs: window.as_secs(),
                retry_after_secs: 0,
            }
        } else {
            // The oldest admitted action determines when a slot frees up
            let retry_after = hits
                .first()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            debug!(key, limit, "action rate limit exceeded");
            RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                window_secs: window.as_secs(),
                retry_after_secs: retry_after.as_secs().max(1),
            }
        }
    }

    /// Drop every window that no longer holds a live timestamp. Called
    /// opportunistically to keep abandoned keys from accumulating.
    pub fn prune(&mut self) {
        let now = Instant::now();
        let window = self.config.window;
        self.windows.retain(|_, hits| {
            hits.retain(|t| now.duration_since(*t) < window);
            !hits.is_empty()
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_actions: u32, window_secs: u64) -> ActionRateLimiter {
        ActionRateLimiter::new(RateLimitConfig {
            max_actions,
            window: Duration::from_secs(window_secs),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_n_plus_one_rejected_within_window() {
        let mut limiter = limiter(3, 60);

        for _ in 0..3 {
            assert!(limiter.check("user-1:update").allowed);
        }

        let decision = limiter.check("user-1:update");
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.retry_after_secs > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_readmits() {
        let mut limiter = limiter(2, 60);

        assert!(limiter.check("k").allowed);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(limiter.check("k").allowed);
        assert!(!limiter.check("k").allowed);

        // 60s after the first action its slot frees up
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.check("k").allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let mut limiter = limiter(1, 60);

        assert!(limiter.check("user-1:update").allowed);
        assert!(!limiter.check("user-1:update").allowed);
        assert!(limiter.check("user-2:update").allowed);
        assert!(limiter.check("user-1:delete").allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_counts_from_oldest_hit() {
        let mut limiter = limiter(1, 60);

        assert!(limiter.check("k").allowed);
        tokio::time::advance(Duration::from_secs(45)).await;

        let decision = limiter.check("k");
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after_secs, 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_drops_dead_windows() {
        let mut limiter = limiter(5, 60);

        limiter.check("a");
        limiter.check("b");
        assert_eq!(limiter.tracked_keys(), 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        limiter.prune();
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
