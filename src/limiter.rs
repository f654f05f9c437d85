//! Per-endpoint request-rate accounting.
//!
//! Each endpoint keeps the timestamps of its accepted requests within the
//! trailing 60-second window. Stale entries are evicted lazily on every call,
//! never by a background task, so the limiter has no task of its own and is
//! safe to query repeatedly.
//!
//! Two tiers of backoff live here. The per-endpoint window answers "can I
//! call this model now" and "how long must I wait". Separately, when every
//! configured endpoint is saturated at once, that signals API-wide throttling
//! rather than a local burst, so the limiter records an exhaustion timestamp
//! and callers wait out a one-hour cooldown before trying any endpoint again.
//!
//! One limiter instance is shared process-wide so the rpm ceilings are
//! respected globally; interior locking keeps that sound even if several
//! pipeline instances are hosted in one process.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::EndpointConfig;

/// Length of the sliding request window.
const WINDOW: Duration = Duration::from_secs(60);

/// Cooldown applied when every endpoint is rate limited simultaneously.
pub const EXHAUSTION_COOLDOWN: Duration = Duration::from_secs(3600);

/// Sliding-window rate limiter over a fixed set of named endpoints.
#[derive(Debug)]
pub struct RateLimiter {
    ceilings: Vec<(String, u32)>,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    windows: HashMap<String, VecDeque<Instant>>,
    exhausted_since: Option<Instant>,
}

impl RateLimiter {
    /// Build a limiter for the configured endpoints.
    pub fn new(endpoints: &[EndpointConfig]) -> Self {
        Self {
            ceilings: endpoints
                .iter()
                .map(|e| (e.name.clone(), e.rpm))
                .collect(),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn ceiling(&self, endpoint: &str) -> u32 {
        self.ceilings
            .iter()
            .find(|(name, _)| name == endpoint)
            .map(|(_, rpm)| *rpm)
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether `endpoint` has room for another request right now.
    ///
    /// Evicts stale window entries as a side effect; that is idempotent and
    /// the only mutation this method performs.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Name of a configured endpoint
    ///
    /// # Returns
    ///
    /// `true` when the endpoint's trailing 60-second window holds fewer
    /// requests than its rpm ceiling. An unknown endpoint has a ceiling of
    /// zero and is never available.
    pub fn can_make_request(&self, endpoint: &str) -> bool {
        let ceiling = self.ceiling(endpoint) as usize;
        let mut inner = self.lock();
        let window = inner.windows.entry(endpoint.to_string()).or_default();
        evict(window, Instant::now());
        window.len() < ceiling
    }

    /// Record an accepted request against `endpoint`.
    ///
    /// Callers must check [`can_make_request`](Self::can_make_request) first;
    /// recording does not enforce the ceiling itself.
    pub fn record_request(&self, endpoint: &str) {
        let mut inner = self.lock();
        let window = inner.windows.entry(endpoint.to_string()).or_default();
        let now = Instant::now();
        evict(window, now);
        window.push_back(now);
    }

    /// How long until `endpoint` has capacity again.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Name of a configured endpoint
    ///
    /// # Returns
    ///
    /// `Duration::ZERO` when the endpoint already has capacity, otherwise
    /// the time until its oldest window entry ages out of the 60-second
    /// window.
    pub fn wait_time(&self, endpoint: &str) -> Duration {
        let ceiling = self.ceiling(endpoint) as usize;
        let mut inner = self.lock();
        let window = inner.windows.entry(endpoint.to_string()).or_default();
        let now = Instant::now();
        evict(window, now);
        if window.len() < ceiling {
            return Duration::ZERO;
        }
        match window.front() {
            Some(oldest) => WINDOW.saturating_sub(now.duration_since(*oldest)),
            None => Duration::ZERO,
        }
    }

    /// True when every configured endpoint fails its capacity check.
    pub fn all_endpoints_rate_limited(&self) -> bool {
        self.ceilings
            .iter()
            .all(|(name, _)| !self.can_make_request(name))
    }

    /// Record the start of a global-exhaustion cooldown.
    ///
    /// A cooldown already in progress is left untouched so repeated detection
    /// does not extend the wait.
    pub fn mark_exhausted(&self) {
        let mut inner = self.lock();
        if inner.exhausted_since.is_none() {
            inner.exhausted_since = Some(Instant::now());
            debug!("global exhaustion cooldown started");
        }
    }

    /// Remaining cooldown, if one is active.
    ///
    /// An expired cooldown is cleared here, so callers that observe `None`
    /// may proceed immediately.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let mut inner = self.lock();
        let since = inner.exhausted_since?;
        let elapsed = Instant::now().duration_since(since);
        if elapsed >= EXHAUSTION_COOLDOWN {
            inner.exhausted_since = None;
            None
        } else {
            Some(EXHAUSTION_COOLDOWN - elapsed)
        }
    }

    /// Whether less than one hour has elapsed since exhaustion was marked.
    pub fn should_sleep_for_hour(&self) -> bool {
        self.cooldown_remaining().is_some()
    }

    /// Clear the exhaustion timestamp after the cooldown has been waited out.
    pub fn clear_exhausted(&self) {
        self.lock().exhausted_since = None;
    }
}

fn evict(window: &mut VecDeque<Instant>, now: Instant) {
    while let Some(oldest) = window.front() {
        if now.duration_since(*oldest) >= WINDOW {
            window.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use tokio::time::advance;

    fn limiter_with(rpm: u32) -> RateLimiter {
        RateLimiter::new(&[EndpointConfig {
            name: "primary".to_string(),
            model: "test-model".to_string(),
            rpm,
        }])
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_boundary() {
        let limiter = limiter_with(3);
        assert!(limiter.can_make_request("primary"));
        for _ in 0..3 {
            limiter.record_request("primary");
        }
        assert!(!limiter.can_make_request("primary"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_drains_after_sixty_seconds() {
        let limiter = limiter_with(2);
        limiter.record_request("primary");
        limiter.record_request("primary");
        assert!(!limiter.can_make_request("primary"));

        advance(Duration::from_secs(59)).await;
        assert!(!limiter.can_make_request("primary"));

        advance(Duration::from_secs(1)).await;
        assert!(limiter.can_make_request("primary"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_time_monotonically_decreases() {
        let limiter = limiter_with(1);
        limiter.record_request("primary");

        let first = limiter.wait_time("primary");
        assert_eq!(first, Duration::from_secs(60));

        advance(Duration::from_secs(20)).await;
        let second = limiter.wait_time("primary");
        assert_eq!(second, Duration::from_secs(40));
        assert!(second < first);

        advance(Duration::from_secs(40)).await;
        assert_eq!(limiter.wait_time("primary"), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_time_zero_under_capacity() {
        let limiter = limiter_with(5);
        limiter.record_request("primary");
        assert_eq!(limiter.wait_time("primary"), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_staggered_requests_evict_oldest_first() {
        let limiter = limiter_with(2);
        limiter.record_request("primary");
        advance(Duration::from_secs(30)).await;
        limiter.record_request("primary");
        assert!(!limiter.can_make_request("primary"));

        // The first request leaves the window at t=60; only one slot opens.
        advance(Duration::from_secs(30)).await;
        assert!(limiter.can_make_request("primary"));
        limiter.record_request("primary");
        assert!(!limiter.can_make_request("primary"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_endpoints_rate_limited() {
        let config = AppConfig::default();
        let limiter = RateLimiter::new(&config.endpoints);
        assert!(!limiter.all_endpoints_rate_limited());

        for endpoint in &config.endpoints {
            for _ in 0..endpoint.rpm {
                limiter.record_request(&endpoint.name);
            }
        }
        assert!(limiter.all_endpoints_rate_limited());

        advance(Duration::from_secs(60)).await;
        assert!(!limiter.all_endpoints_rate_limited());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_lifecycle() {
        let limiter = limiter_with(1);
        assert!(!limiter.should_sleep_for_hour());

        limiter.mark_exhausted();
        assert!(limiter.should_sleep_for_hour());

        advance(Duration::from_secs(1800)).await;
        let remaining = limiter.cooldown_remaining().unwrap();
        assert_eq!(remaining, Duration::from_secs(1800));

        advance(Duration::from_secs(1800)).await;
        assert!(!limiter.should_sleep_for_hour());
        // Expired cooldown was cleared, not just reported as done.
        assert!(limiter.cooldown_remaining().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_exhausted_does_not_extend_cooldown() {
        let limiter = limiter_with(1);
        limiter.mark_exhausted();
        advance(Duration::from_secs(3000)).await;
        limiter.mark_exhausted();
        assert_eq!(
            limiter.cooldown_remaining(),
            Some(Duration::from_secs(600))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_exhausted() {
        let limiter = limiter_with(1);
        limiter.mark_exhausted();
        limiter.clear_exhausted();
        assert!(!limiter.should_sleep_for_hour());
    }
}
