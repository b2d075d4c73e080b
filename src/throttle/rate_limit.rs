//! Adaptive per-key rate limiting
//!
//! Each key (normally a domain) moves through `ok -> backoff -> blocked`
//! as throttling responses come in and drops back to `ok` on the next
//! success, which still spaces the following request by the floor delay. Delays grow as `base * 2^failures`, capped at `max_delay_ms`
//! and never below `floor_delay_ms`. A server supplied Retry-After always
//! wins over the local estimate.
//!
//! The adapter can be shared between sessions that target the same domain;
//! all state sits behind a single lock over the key map.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use crate::error::{EvasionError, EvasionResult};

/// Backoff tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Delay unit for the exponential estimate
    pub base_delay_ms: u64,
    /// Cap for the exponential estimate
    pub max_delay_ms: u64,
    /// Smallest delay ever recommended
    pub floor_delay_ms: u64,
    /// Upper bound of the random jitter as a fraction of the estimate
    pub jitter_ratio: f64,
    /// Consecutive failures after which a key is blocked
    pub block_threshold: u32,
    /// Outcomes kept per key
    pub history_limit: usize,
    /// Consecutive successes after which the history is cleared
    pub history_reset_after: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            floor_delay_ms: 100,
            jitter_ratio: 0.1,
            block_threshold: 5,
            history_limit: 20,
            history_reset_after: 10,
        }
    }
}

/// Throttling state of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitStatus {
    #[default]
    Ok,
    Backoff,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    Success,
    RateLimited,
}

/// One recorded outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitEvent {
    pub outcome: RequestOutcome,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<f64>,
}

/// Snapshot of a key's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitState {
    pub key: String,
    pub status: RateLimitStatus,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub next_allowed_at: Option<DateTime<Utc>>,
    pub current_delay_millis: u64,
    pub last_jitter_millis: u64,
    /// Time left until `next_allowed_at`, zero when allowed
    pub delay_remaining_millis: u64,
    pub allowed: bool,
    pub history: Vec<RateLimitEvent>,
}

#[derive(Debug, Clone)]
struct KeyState {
    status: RateLimitStatus,
    consecutive_failures: u32,
    consecutive_successes: u32,
    next_allowed_at: Option<DateTime<Utc>>,
    current_delay_ms: u64,
    last_jitter_ms: u64,
    history: VecDeque<RateLimitEvent>,
}

impl KeyState {
    fn new(floor_delay_ms: u64) -> Self {
        Self {
            status: RateLimitStatus::Ok,
            consecutive_failures: 0,
            consecutive_successes: 0,
            next_allowed_at: None,
            current_delay_ms: floor_delay_ms,
            last_jitter_ms: 0,
            history: VecDeque::new(),
        }
    }

    fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        self.next_allowed_at
            .map(|next| (next - now).num_milliseconds().max(0) as u64)
            .unwrap_or(0)
    }

    fn snapshot(&self, key: &str, now: DateTime<Utc>) -> RateLimitState {
        let remaining = self.remaining_ms(now);
        RateLimitState {
            key: key.to_string(),
            status: self.status,
            consecutive_failures: self.consecutive_failures,
            consecutive_successes: self.consecutive_successes,
            next_allowed_at: self.next_allowed_at,
            current_delay_millis: self.current_delay_ms,
            last_jitter_millis: self.last_jitter_ms,
            delay_remaining_millis: remaining,
            allowed: remaining == 0,
            history: self.history.iter().cloned().collect(),
        }
    }
}

/// Keyed exponential backoff with Retry-After support
pub struct RateLimitAdapter {
    config: RateLimitConfig,
    states: Mutex<HashMap<String, KeyState>>,
    rng: Mutex<StdRng>,
    clock: Arc<dyn Clock>,
}

impl Default for RateLimitAdapter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl RateLimitAdapter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
            rng: Mutex::new(StdRng::from_entropy()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Adapter with reproducible jitter
    pub fn with_seed(config: RateLimitConfig, seed: u64) -> Self {
        let adapter = Self::new(config);
        *adapter.rng.lock() = StdRng::seed_from_u64(seed);
        adapter
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record a successful request; clears backoff and blocking.
    ///
    /// The next request still waits the floor delay plus jitter.
    pub fn record_success(&self, key: &str) -> EvasionResult<RateLimitState> {
        let key = normalize_key(key)?;
        let now = self.clock.now();
        let mut states = self.states.lock();
        let state = states
            .entry(key.clone())
            .or_insert_with(|| KeyState::new(self.config.floor_delay_ms));

        if state.status != RateLimitStatus::Ok {
            debug!("Rate limit on {} lifted after success", key);
        }

        state.status = RateLimitStatus::Ok;
        state.consecutive_failures = 0;
        state.consecutive_successes = state.consecutive_successes.saturating_add(1);
        let floor = self.config.floor_delay_ms;
        let jitter = self.jitter(floor);
        state.current_delay_ms = floor;
        state.last_jitter_ms = jitter;
        state.next_allowed_at = Some(after(now, floor.saturating_add(jitter)));

        if self.config.history_reset_after > 0
            && state.consecutive_successes == self.config.history_reset_after
        {
            debug!("Clearing rate limit history for {}", key);
            state.history.clear();
        }

        self.push_event(
            state,
            RateLimitEvent {
                outcome: RequestOutcome::Success,
                at: now,
                retry_after_seconds: None,
            },
        );

        Ok(state.snapshot(&key, now))
    }

    /// Record a throttling response, optionally with the server's Retry-After
    pub fn record_rate_limited(
        &self,
        key: &str,
        retry_after_seconds: Option<f64>,
    ) -> EvasionResult<RateLimitState> {
        let key = normalize_key(key)?;
        if let Some(retry) = retry_after_seconds {
            if !retry.is_finite() || retry < 0.0 {
                return Err(EvasionError::invalid(format!(
                    "retry-after {} must be a non-negative number of seconds",
                    retry
                )));
            }
        }

        let now = self.clock.now();
        let mut states = self.states.lock();
        let state = states
            .entry(key.clone())
            .or_insert_with(|| KeyState::new(self.config.floor_delay_ms));

        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.consecutive_successes = 0;

        match retry_after_seconds {
            Some(retry) => {
                let delay_ms = (retry * 1000.0).round() as u64;
                state.current_delay_ms = delay_ms;
                state.last_jitter_ms = 0;
                state.next_allowed_at = Some(after(now, delay_ms));
            }
            None => {
                let estimate = self.backoff_estimate(state.consecutive_failures);
                let jitter = self.jitter(estimate);
                state.current_delay_ms = estimate;
                state.last_jitter_ms = jitter;
                state.next_allowed_at = Some(after(now, estimate.saturating_add(jitter)));
            }
        }

        let blocked = self.config.block_threshold > 0
            && state.consecutive_failures >= self.config.block_threshold;
        if blocked {
            if state.status != RateLimitStatus::Blocked {
                info!(
                    "Blocking {} after {} consecutive rate limits",
                    key, state.consecutive_failures
                );
            }
            state.status = RateLimitStatus::Blocked;
        } else {
            state.status = RateLimitStatus::Backoff;
        }

        debug!(
            "Rate limited on {}: failures={}, delay={}ms, jitter={}ms",
            key, state.consecutive_failures, state.current_delay_ms, state.last_jitter_ms
        );

        self.push_event(
            state,
            RateLimitEvent {
                outcome: RequestOutcome::RateLimited,
                at: now,
                retry_after_seconds,
            },
        );

        Ok(state.snapshot(&key, now))
    }

    /// Whether a request to `key` may go out now. Unknown keys are allowed.
    pub fn is_allowed(&self, key: &str) -> bool {
        self.delay_remaining(key) == 0
    }

    /// Milliseconds until `key` is allowed again
    pub fn delay_remaining(&self, key: &str) -> u64 {
        let Ok(key) = normalize_key(key) else {
            return 0;
        };
        let now = self.clock.now();
        self.states
            .lock()
            .get(&key)
            .map(|state| state.remaining_ms(now))
            .unwrap_or(0)
    }

    /// Snapshot of `key`; unseen keys report a fresh `ok` state
    pub fn state(&self, key: &str) -> EvasionResult<RateLimitState> {
        let key = normalize_key(key)?;
        let now = self.clock.now();
        let states = self.states.lock();
        Ok(match states.get(&key) {
            Some(state) => state.snapshot(&key, now),
            None => KeyState::new(self.config.floor_delay_ms).snapshot(&key, now),
        })
    }

    /// Forget everything about `key`. Returns whether any state existed.
    pub fn reset(&self, key: &str) -> bool {
        let Ok(key) = normalize_key(key) else {
            return false;
        };
        let removed = self.states.lock().remove(&key).is_some();
        if removed {
            debug!("Reset rate limit state for {}", key);
        }
        removed
    }

    /// Keys with recorded state, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.states.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// `min(max, base * 2^failures)`, never below the floor
    fn backoff_estimate(&self, failures: u32) -> u64 {
        let exponent = failures.min(62) as i32;
        let raw = self.config.base_delay_ms as f64 * 2f64.powi(exponent);
        let capped = raw.min(self.config.max_delay_ms as f64);
        (capped as u64).max(self.config.floor_delay_ms)
    }

    fn jitter(&self, estimate: u64) -> u64 {
        let ratio = self.config.jitter_ratio.clamp(0.0, 1.0);
        let bound = (estimate as f64 * ratio) as u64;
        if bound == 0 {
            return 0;
        }
        self.rng.lock().gen_range(0..=bound)
    }

    fn push_event(&self, state: &mut KeyState, event: RateLimitEvent) {
        state.history.push_back(event);
        while state.history.len() > self.config.history_limit {
            state.history.pop_front();
        }
    }
}

/// Upper bound on any scheduled wait (100 years)
const MAX_WAIT_MS: u64 = 100 * 365 * 24 * 3600 * 1000;

fn after(now: DateTime<Utc>, millis: u64) -> DateTime<Utc> {
    let millis = millis.min(MAX_WAIT_MS) as i64;
    now.checked_add_signed(Duration::milliseconds(millis))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn normalize_key(key: &str) -> EvasionResult<String> {
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        return Err(EvasionError::invalid("rate limit key is empty"));
    }
    Ok(key)
}
