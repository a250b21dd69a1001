//! Sliding-window rate limiter for provider requests and tokens

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const WINDOW: Duration = Duration::from_secs(60);

/// Limits requests and tokens per minute over a sliding one-minute window
pub struct RateLimiter {
    requests_per_minute: u32,
    tokens_per_minute: u32,
    last_requests: Mutex<VecDeque<Instant>>,
    token_usage: Mutex<VecDeque<(Instant, u32)>>,
}

impl RateLimiter {
    /// Create a new rate limiter. A limit of 0 disables that limit.
    pub fn new(requests_per_minute: u32, tokens_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            tokens_per_minute,
            last_requests: Mutex::new(VecDeque::new()),
            token_usage: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a request may be sent, then record it
    pub async fn acquire(&self) -> RateLimitGuard {
        loop {
            let wait = {
                let mut last = self.last_requests.lock().await;
                let now = Instant::now();
                prune(&mut last, now, |t| *t);

                if self.requests_per_minute == 0 || last.len() < self.requests_per_minute as usize {
                    last.push_back(now);
                    None
                } else {
                    // Wait until the oldest request leaves the window
                    last.front()
                        .map(|&oldest| WINDOW.saturating_sub(now.duration_since(oldest)) + Duration::from_millis(10))
                }
            };

            match wait {
                None => {
                    self.wait_for_token_capacity(0).await;
                    return RateLimitGuard { _private: () };
                }
                Some(wait) => {
                    tracing::debug!("Request limit reached, waiting {}ms", wait.as_millis());
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Record token usage for rate limiting
    pub async fn record_tokens(&self, tokens: u32) {
        let mut usage = self.token_usage.lock().await;
        let now = Instant::now();
        prune(&mut usage, now, |(t, _)| *t);
        usage.push_back((now, tokens));
    }

    /// Tokens used in the last minute
    pub async fn current_token_usage(&self) -> u32 {
        let mut usage = self.token_usage.lock().await;
        prune(&mut usage, Instant::now(), |(t, _)| *t);
        usage.iter().map(|(_, t)| t).sum()
    }

    /// Check if we have token capacity
    pub async fn has_token_capacity(&self, needed: u32) -> bool {
        if self.tokens_per_minute == 0 {
            return true;
        }
        let current = self.current_token_usage().await;
        // An exhausted window blocks even zero-token requests
        current < self.tokens_per_minute && current.saturating_add(needed) <= self.tokens_per_minute
    }

    /// Wait for token capacity
    pub async fn wait_for_token_capacity(&self, needed: u32) {
        while !self.has_token_capacity(needed).await {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

fn prune<T>(queue: &mut VecDeque<T>, now: Instant, time_of: impl Fn(&T) -> Instant) {
    while let Some(front) = queue.front() {
        if now.duration_since(time_of(front)) > WINDOW {
            queue.pop_front();
        } else {
            break;
        }
    }
}

/// Guard returned when rate limit permission is acquired
pub struct RateLimitGuard {
    _private: (),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_basic() {
        let limiter = RateLimiter::new(5, 1000);

        // Should be able to make 5 requests immediately
        for _ in 0..5 {
            let _guard = limiter.acquire().await;
        }
    }

    #[tokio::test]
    async fn test_token_recording() {
        let limiter = RateLimiter::new(60, 1000);

        limiter.record_tokens(100).await;
        limiter.record_tokens(200).await;

        assert_eq!(limiter.current_token_usage().await, 300);
        assert!(limiter.has_token_capacity(700).await);
        assert!(!limiter.has_token_capacity(701).await);
    }

    #[tokio::test]
    async fn test_zero_limits_disable_limiting() {
        let limiter = RateLimiter::new(0, 0);
        for _ in 0..100 {
            let _guard = limiter.acquire().await;
        }
        limiter.record_tokens(u32::MAX / 2).await;
        assert!(limiter.has_token_capacity(1_000_000).await);
    }
}
