//! Fetch orchestration configuration.
//!
//! Every interval here is configuration, not a hard-coded constant: the
//! defaults match the behavior tuned for interactive map panning, and each
//! is caller-overridable through the `with_*` builders.

use std::time::Duration;

/// Default quiet period before a pending viewport executes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);

/// Default minimum spacing between fetch executions.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(1500);

/// Default cache entry time-to-live.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default age past which a valid entry triggers a background refresh.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(180);

/// Default bound on a single network attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// Default page size requested from the listings API.
///
/// Generously sized so a viewport resolves in one request instead of
/// paginating.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default minimum viewport span (degrees) below which bounds are
/// considered degenerate.
pub const DEFAULT_MIN_SPAN_DEG: f64 = 1e-6;

/// Configuration for [`FetchController`](super::FetchController).
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Quiet period with no further `schedule` calls before executing.
    pub debounce: Duration,
    /// Minimum spacing between fetch executions.
    pub throttle: Duration,
    /// Cache entry time-to-live.
    pub cache_ttl: Duration,
    /// Entry age that triggers a background refresh on a cache hit.
    pub stale_after: Duration,
    /// Bound on each network attempt; elapsing counts as a fetch failure.
    pub request_timeout: Duration,
    /// Page size requested from the listings API.
    pub page_size: u32,
    /// Minimum viewport span in degrees; smaller bounds are ignored.
    pub min_span_deg: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            throttle: DEFAULT_THROTTLE,
            cache_ttl: DEFAULT_CACHE_TTL,
            stale_after: DEFAULT_STALE_AFTER,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            min_span_deg: DEFAULT_MIN_SPAN_DEG,
        }
    }
}

impl FetchConfig {
    /// Set the debounce interval.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the throttle interval.
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Set the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the background-refresh staleness threshold.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the listings API page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(600));
        assert_eq!(config.throttle, Duration::from_millis(1500));
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.stale_after, Duration::from_secs(180));
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn test_builder_overrides() {
        let config = FetchConfig::default()
            .with_debounce(Duration::from_millis(100))
            .with_throttle(Duration::from_millis(200))
            .with_cache_ttl(Duration::from_secs(60))
            .with_stale_after(Duration::from_secs(10))
            .with_request_timeout(Duration::from_secs(5))
            .with_page_size(25);

        assert_eq!(config.debounce, Duration::from_millis(100));
        assert_eq!(config.throttle, Duration::from_millis(200));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.stale_after, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.page_size, 25);
    }
}
