//! Client configuration options.

use std::time::Duration;

use crate::endpoints::BASE_URL;

/// Configuration for the [`Client`](crate::Client).
///
/// ```
/// use std::time::Duration;
/// use xero_access::{BackoffConfig, ClientConfig};
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_user_agent("my-app/1.0")
///     .with_backoff(BackoffConfig::default().with_max_retries(5));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root that request paths are resolved against
    pub base_url: String,
    /// User-Agent header value
    pub user_agent: String,
    /// Request timeout, `None` leaves requests unbounded
    pub timeout: Option<Duration>,
    /// Per-tenant request window
    pub rate_limit: RateLimitConfig,
    /// Handling of 429 responses
    pub backoff: BackoffConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            user_agent: format!("xero-access/{} (Rust)", env!("CARGO_PKG_VERSION")),
            timeout: Some(Duration::from_secs(30)),
            rate_limit: RateLimitConfig::default(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `XERO_API_BASE_URL` and `XERO_USER_AGENT` when set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("XERO_API_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(user_agent) = std::env::var("XERO_USER_AGENT") {
            config.user_agent = user_agent;
        }
        config
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Sliding window applied per tenant before each request.
///
/// Xero allows 60 calls per minute per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Number of request instants retained per tenant
    pub max_requests: usize,
    /// Age the oldest retained instant must reach before another send
    pub window: Duration,
    /// Added to computed delays so the window has rolled over on wake-up
    pub guard: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
            guard: Duration::from_millis(1),
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            ..Self::default()
        }
    }
}

/// Retry behaviour for `429 Too Many Requests` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Retries allowed per request, `None` retries for as long as the server
    /// keeps throttling
    pub max_retries: Option<u32>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: Some(3),
        }
    }
}

impl BackoffConfig {
    /// Retry every throttled response with no upper bound.
    #[must_use]
    pub fn unbounded() -> Self {
        Self { max_retries: None }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}
