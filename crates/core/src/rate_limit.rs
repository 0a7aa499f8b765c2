//! Process-wide spacing of outbound calls per provider.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default minimum spacing between two calls to the same provider.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1500);

/// At most `max_calls` calls in any `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimit {
    pub max_calls: usize,
    pub period: Duration,
}

/// The limits applied to one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub min_interval: Duration,
    pub window: Option<WindowLimit>,
}

impl RateLimit {
    pub fn interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            window: None,
        }
    }

    pub fn with_window(mut self, max_calls: usize, period: Duration) -> Self {
        self.window = (max_calls > 0).then_some(WindowLimit { max_calls, period });
        self
    }
}

#[derive(Debug, Default)]
struct ProviderSlots {
    last_call: Option<Instant>,
    recent: VecDeque<Instant>,
}

/// Serializes calls per provider name.
///
/// `acquire` reserves the next free slot for a provider inside one critical
/// section and then sleeps until that slot outside the lock, so concurrent
/// callers queue up behind each other instead of all passing the check at once.
#[derive(Debug)]
pub struct RateLimiter {
    default_limit: RateLimit,
    overrides: HashMap<String, RateLimit>,
    state: Mutex<HashMap<String, ProviderSlots>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            default_limit: RateLimit::interval(min_interval),
            overrides: HashMap::new(),
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Applies a stricter limit to one provider.
    pub fn with_limit(mut self, provider: impl Into<String>, limit: RateLimit) -> Self {
        self.overrides.insert(provider.into(), limit);
        self
    }

    pub fn limit_for(&self, provider: &str) -> RateLimit {
        self.overrides
            .get(provider)
            .copied()
            .unwrap_or(self.default_limit)
    }

    /// Waits until `provider` may be called again and records the call.
    pub async fn acquire(&self, provider: &str) {
        let slot = self.reserve(provider).await;
        let now = Instant::now();
        if slot > now {
            debug!(provider, wait_ms = (slot - now).as_millis() as u64, "Rate limit wait");
            tokio::time::sleep_until(slot).await;
        }
    }

    /// The start time of the most recent call reserved for `provider`.
    pub async fn last_call(&self, provider: &str) -> Option<Instant> {
        self.state
            .lock()
            .await
            .get(provider)
            .and_then(|slots| slots.last_call)
    }

    async fn reserve(&self, provider: &str) -> Instant {
        let limit = self.limit_for(provider);
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let slots = state.entry(provider.to_string()).or_default();

        let mut slot = match slots.last_call {
            Some(last) => now.max(last + limit.min_interval),
            None => now,
        };

        if let Some(window) = limit.window {
            // `recent` never holds more than `max_calls` entries, so the front
            // is the call that must fall out of the window before this one.
            if slots.recent.len() >= window.max_calls {
                if let Some(&oldest) = slots.recent.front() {
                    slot = slot.max(oldest + window.period);
                }
            }
            slots.recent.push_back(slot);
            while slots.recent.len() > window.max_calls {
                slots.recent.pop_front();
            }
        }

        slots.last_call = Some(slot);
        slot
    }
}
