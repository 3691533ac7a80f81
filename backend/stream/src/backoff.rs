//! Reconnection backoff: `delay(n) = min(base * factor^n, max)`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Backoff policy for reconnecting a dropped stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect, in milliseconds.
    pub base_delay_ms: u64,
    /// Growth factor applied per attempt.
    pub decay_factor: f64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Give up after this many consecutive failed attempts. `None` retries
    /// until the caller disconnects.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            decay_factor: 1.5,
            max_delay_ms: 30_000,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay to wait after `attempt` previous failures (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let raw = self.base_delay_ms as f64 * self.decay_factor.powi(exponent);
        let capped = raw.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped.round() as u64)
    }

    pub fn should_retry(&self, attempts_made: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts_made < max)
    }
}

/// Transient reconnect bookkeeping for one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectState {
    pub attempt: u32,
    pub next_delay_ms: u64,
}

impl ReconnectState {
    /// Record a failed or aborted connection. Returns how long to wait
    /// before the next attempt, or `None` once the policy is exhausted.
    pub fn record_failure(&mut self, policy: &ReconnectPolicy) -> Option<Duration> {
        if !policy.should_retry(self.attempt) {
            warn!(attempts = self.attempt, "Reconnect policy exhausted");
            return None;
        }
        let delay = policy.delay_for(self.attempt);
        self.attempt += 1;
        self.next_delay_ms = delay.as_millis() as u64;
        Some(delay)
    }

    /// Called when a connection opens successfully.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delays_match_formula() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0).as_millis(), 1_000);
        assert_eq!(policy.delay_for(1).as_millis(), 1_500);
        assert_eq!(policy.delay_for(2).as_millis(), 2_250);
        assert_eq!(policy.delay_for(5).as_millis(), 7_594);
        assert_eq!(policy.delay_for(20).as_millis(), 30_000);
    }

    #[test]
    fn delay_never_exceeds_cap() {
        let policy = ReconnectPolicy::default();
        for n in 0..200 {
            let d = policy.delay_for(n).as_millis();
            let expected = (1000.0 * 1.5f64.powi(n as i32)).min(30_000.0).round() as u128;
            assert_eq!(d, expected, "attempt {n}");
        }
        assert_eq!(policy.delay_for(u32::MAX).as_millis(), 30_000);
    }

    #[test]
    fn unbounded_by_default() {
        let policy = ReconnectPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1_000_000));
    }

    #[test]
    fn state_counts_attempts_and_resets() {
        let policy = ReconnectPolicy::default();
        let mut state = ReconnectState::default();
        assert_eq!(state.record_failure(&policy), Some(Duration::from_millis(1_000)));
        assert_eq!(state.attempt, 1);
        assert_eq!(state.record_failure(&policy), Some(Duration::from_millis(1_500)));
        assert_eq!(state.attempt, 2);
        assert_eq!(state.next_delay_ms, 1_500);
        state.reset();
        assert_eq!(state, ReconnectState::default());
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let policy = ReconnectPolicy {
            max_attempts: Some(2),
            ..Default::default()
        };
        let mut state = ReconnectState::default();
        assert!(state.record_failure(&policy).is_some());
        assert!(state.record_failure(&policy).is_some());
        assert!(state.record_failure(&policy).is_none());
        assert_eq!(state.attempt, 2);
    }
}
