//! Per-tenant request window and rate-limit header inspection.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use reqwest::header::HeaderMap;

use crate::config::RateLimitConfig;
use crate::tenant::TenantId;

// Rate limiting headers used by the Xero API
/// Header containing number of remaining daily API calls
const HEADER_DAY_LIMIT_REMAINING: &str = "X-DayLimit-Remaining";
/// Header containing number of remaining per-minute API calls
const HEADER_MIN_LIMIT_REMAINING: &str = "X-MinLimit-Remaining";
/// Header containing number of remaining app-wide per-minute API calls
const HEADER_APP_MIN_LIMIT_REMAINING: &str = "X-AppMinLimit-Remaining";
/// Header identifying which rate limit was hit when a 429 is returned
pub(crate) const HEADER_RATE_LIMIT_PROBLEM: &str = "X-Rate-Limit-Problem";

/// The most recent send instants of one tenant, oldest first.
#[derive(Debug, Default)]
struct RateWindow {
    sent: VecDeque<Instant>,
}

impl RateWindow {
    fn delay_at(&self, now: Instant, config: &RateLimitConfig) -> Duration {
        if self.sent.len() < config.max_requests {
            return Duration::ZERO;
        }
        let Some(oldest) = self.sent.front() else {
            return Duration::ZERO;
        };
        let elapsed = now.saturating_duration_since(*oldest);
        if elapsed >= config.window {
            Duration::ZERO
        } else {
            config.window - elapsed + config.guard
        }
    }

    fn record(&mut self, at: Instant, capacity: usize) {
        self.sent.push_back(at);
        while self.sent.len() > capacity {
            self.sent.pop_front();
        }
    }
}

/// Registry of request windows, one per tenant, created on first use.
///
/// Entries only leave a window when newer ones push them out, so a burst
/// followed by idle time still occupies its slots until enough new requests
/// arrive. Safe to share between concurrent callers.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<TenantId, Arc<Mutex<RateWindow>>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn window(&self, tenant: &TenantId) -> Arc<Mutex<RateWindow>> {
        Arc::clone(self.windows.lock().entry(tenant.clone()).or_default())
    }

    /// How long a request for `tenant` issued at `now` must wait.
    pub fn delay_for(&self, tenant: &TenantId, now: Instant) -> Duration {
        self.window(tenant).lock().delay_at(now, &self.config)
    }

    /// Records a request for `tenant` at instant `at`.
    pub fn record(&self, tenant: &TenantId, at: Instant) {
        self.window(tenant).lock().record(at, self.config.max_requests);
    }

    /// Number of instants currently retained for `tenant`.
    pub fn recorded(&self, tenant: &TenantId) -> usize {
        self.windows
            .lock()
            .get(tenant)
            .map_or(0, |window| window.lock().sent.len())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[derive(Debug, Clone, Default)]
/// Information about the remaining API rate limits
///
/// Xero applies several rate limits to API usage:
/// - Daily limit: 5000 calls per day per tenant
/// - Minute limit: 60 calls per minute per tenant
/// - App minute limit: 10,000 calls per minute across all tenants
pub struct RateLimitInfo {
    /// Number of remaining API calls for the day (out of 5000)
    pub day_limit_remaining: Option<u32>,
    /// Number of remaining API calls for the minute (out of 60)
    pub minute_limit_remaining: Option<u32>,
    /// Number of remaining API calls for the app across all tenants (out of 10,000)
    pub app_minute_limit_remaining: Option<u32>,
}

impl RateLimitInfo {
    /// Extract rate limit information from response headers
    #[must_use]
    pub fn from_response_headers(headers: &HeaderMap) -> Self {
        let remaining = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u32>().ok())
        };
        Self {
            day_limit_remaining: remaining(HEADER_DAY_LIMIT_REMAINING),
            minute_limit_remaining: remaining(HEADER_MIN_LIMIT_REMAINING),
            app_minute_limit_remaining: remaining(HEADER_APP_MIN_LIMIT_REMAINING),
        }
    }

    /// Returns true if any of the limits are close to being exhausted
    #[must_use]
    pub fn is_near_limit(&self) -> bool {
        self.day_limit_remaining.is_some_and(|v| v < 100)
            || self.minute_limit_remaining.is_some_and(|v| v < 10)
            || self.app_minute_limit_remaining.is_some_and(|v| v < 100)
    }

    /// Log current rate limit status if getting close to limits
    pub fn log_if_near_limit(&self) {
        if self.is_near_limit() {
            warn!(
                day = ?self.day_limit_remaining,
                minute = ?self.minute_limit_remaining,
                app_minute = ?self.app_minute_limit_remaining,
                "approaching Xero API rate limits"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use reqwest::header::HeaderValue;

    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("org-1")
    }

    #[test]
    fn no_delay_below_capacity() {
        let limiter = RateLimiter::default();
        let t0 = Instant::now();
        for recorded in 0..60 {
            assert_eq!(limiter.delay_for(&tenant(), t0), Duration::ZERO);
            if recorded < 59 {
                limiter.record(&tenant(), t0);
            }
        }
        assert_eq!(limiter.recorded(&tenant()), 59);
    }

    #[test]
    fn full_window_delays_until_oldest_expires() {
        let limiter = RateLimiter::default();
        let t0 = Instant::now();
        for _ in 0..60 {
            limiter.record(&tenant(), t0);
        }

        let delay = limiter.delay_for(&tenant(), t0 + Duration::from_secs(30));
        assert_eq!(
            delay,
            Duration::from_secs(30) + Duration::from_millis(1)
        );

        let delay = limiter.delay_for(&tenant(), t0 + Duration::from_secs(61));
        assert_eq!(delay, Duration::ZERO);
    }

    #[test]
    fn record_evicts_oldest_beyond_capacity() {
        let limiter = RateLimiter::new(RateLimitConfig::new(3, Duration::from_secs(10)));
        let t0 = Instant::now();
        for i in 0..5 {
            limiter.record(&tenant(), t0 + Duration::from_secs(i));
        }
        assert_eq!(limiter.recorded(&tenant()), 3);
        // Oldest retained is t0 + 2s, so at t0 + 7s it has aged 5s.
        assert_eq!(
            limiter.delay_for(&tenant(), t0 + Duration::from_secs(7)),
            Duration::from_secs(5) + Duration::from_millis(1)
        );
    }

    #[test]
    fn burst_of_sixty_five_induces_a_single_delay() {
        let limiter = RateLimiter::default();
        let step = Duration::from_millis(1);
        let mut now = Instant::now();
        let mut delays = Vec::new();

        for _ in 0..65 {
            let delay = limiter.delay_for(&tenant(), now);
            if !delay.is_zero() {
                delays.push(delay);
                now += delay;
            }
            limiter.record(&tenant(), now);
            now += step;
        }

        assert_eq!(delays.len(), 1, "unexpected delays: {delays:?}");
        // Sixty requests took 60ms, so the wait is the rest of the minute.
        assert_eq!(delays[0], Duration::from_millis(60_000 - 60 + 1));
        assert_eq!(limiter.recorded(&tenant()), 60);
    }

    #[test]
    fn tenants_are_tracked_independently() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(60)));
        let other = TenantId::new("org-2");
        let t0 = Instant::now();
        limiter.record(&tenant(), t0);
        limiter.record(&tenant(), t0);

        assert!(!limiter.delay_for(&tenant(), t0).is_zero());
        assert_eq!(limiter.delay_for(&other, t0), Duration::ZERO);
        assert_eq!(limiter.recorded(&other), 0);
    }

    #[test]
    fn concurrent_records_respect_capacity() {
        let limiter = Arc::new(RateLimiter::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || {
                    for _ in 0..25 {
                        limiter.record(&TenantId::new("org-1"), Instant::now());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(limiter.recorded(&tenant()), 60);
    }

    #[test]
    fn rate_limit_info_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-daylimit-remaining", HeaderValue::from_static("4000"));
        headers.insert("x-minlimit-remaining", HeaderValue::from_static("5"));
        headers.insert("x-appminlimit-remaining", HeaderValue::from_static("abc"));

        let info = RateLimitInfo::from_response_headers(&headers);
        assert_eq!(info.day_limit_remaining, Some(4000));
        assert_eq!(info.minute_limit_remaining, Some(5));
        assert_eq!(info.app_minute_limit_remaining, None);
        assert!(info.is_near_limit());
        assert!(!RateLimitInfo::default().is_near_limit());
    }
}
