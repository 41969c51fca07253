/*!
 * # Rate Limiting
 *
 * In-memory request limiter keyed by (client IP, request path) with a
 * window-reset counting scheme and standard `X-RateLimit-*` headers.
 *
 * The counters live in this process only: multiple server instances each
 * enforce their own quota, so the effective limit is approximate. A shared
 * backend would be required for exact multi-instance enforcement.
 */

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_duration: Duration,
    pub enable_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_duration: Duration::from_secs(3600),
            enable_headers: true,
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

/// Outcome of a limiter check, used to populate response headers.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after_secs: u64,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    entries: DashMap<String, RateLimitEntry>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    /// Records a hit for `key` and reports whether it stays within quota.
    pub fn check(&self, key: &str) -> Result<RateLimitStatus, RateLimitStatus> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) > self.config.window_duration {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;

        let elapsed = now.duration_since(entry.window_start);
        let reset_after_secs = self
            .config
            .window_duration
            .saturating_sub(elapsed)
            .as_secs();
        let status = RateLimitStatus {
            limit: self.config.requests_per_window,
            remaining: self.config.requests_per_window.saturating_sub(entry.count),
            reset_after_secs,
        };

        if entry.count > self.config.requests_per_window {
            Err(status)
        } else {
            Ok(status)
        }
    }

    /// Drops entries whose window expired more than a day ago.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let horizon = self.config.window_duration + Duration::from_secs(24 * 60 * 60);
        self.entries
            .retain(|_, entry| now.duration_since(entry.window_start) < horizon);
    }

    pub fn headers_enabled(&self) -> bool {
        self.config.enable_headers
    }
}

/// Spawns the hourly cleanup loop for stale counters.
pub fn start_cleanup(limiter: Arc<RateLimiter>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        interval.tick().await;
        loop {
            interval.tick().await;
            limiter.cleanup();
        }
    });
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(response: &mut Response, status: &RateLimitStatus) {
    let headers = response.headers_mut();
    headers.insert(
        "x-ratelimit-limit",
        HeaderValue::from_str(&status.limit.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    headers.insert(
        "x-ratelimit-remaining",
        HeaderValue::from_str(&status.remaining.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    headers.insert(
        "x-ratelimit-reset",
        HeaderValue::from_str(&status.reset_after_secs.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
}

/// Axum middleware enforcing the limiter per (client IP, path).
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(request.headers());
    let path = request.uri().path().to_string();
    let key = format!("{}:{}", ip, path);

    match limiter.check(&key) {
        Ok(status) => {
            debug!(key = %key, remaining = status.remaining, "rate limit check passed");
            let mut response = next.run(request).await;
            if limiter.headers_enabled() {
                apply_headers(&mut response, &status);
            }
            response
        }
        Err(status) => {
            warn!(key = %key, "rate limit exceeded");
            let mut response = ServiceError::RateLimitExceeded.into_response();
            if limiter.headers_enabled() {
                apply_headers(&mut response, &status);
                response.headers_mut().insert(
                    "retry-after",
                    HeaderValue::from_str(&status.reset_after_secs.to_string())
                        .unwrap_or_else(|_| HeaderValue::from_static("0")),
                );
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_quota_then_rejects() {
        let limiter = RateLimiter::new(RateLimitConfig {
            requests_per_window: 3,
            window_duration: Duration::from_secs(60),
            enable_headers: true,
        });

        assert!(limiter.check("1.2.3.4:/api/v1/deliveries").is_ok());
        assert!(limiter.check("1.2.3.4:/api/v1/deliveries").is_ok());
        assert!(limiter.check("1.2.3.4:/api/v1/deliveries").is_ok());
        assert!(limiter.check("1.2.3.4:/api/v1/deliveries").is_err());

        // Other keys are tracked independently.
        assert!(limiter.check("1.2.3.4:/api/v1/inventory").is_ok());
        assert!(limiter.check("5.6.7.8:/api/v1/deliveries").is_ok());
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let limiter = RateLimiter::new(RateLimitConfig {
            requests_per_window: 1,
            window_duration: Duration::from_millis(0),
            enable_headers: false,
        });

        assert!(limiter.check("k").is_ok());
        std::thread::sleep(Duration::from_millis(5));
        // The previous window has passed; the counter starts over.
        assert!(limiter.check("k").is_ok());
    }

    #[test]
    fn remaining_counts_down() {
        let limiter = RateLimiter::new(RateLimitConfig {
            requests_per_window: 2,
            window_duration: Duration::from_secs(60),
            enable_headers: true,
        });

        let first = limiter.check("k").unwrap();
        assert_eq!(first.remaining, 1);
        let second = limiter.check("k").unwrap();
        assert_eq!(second.remaining, 0);
    }
}
