//! Circuit breaker pattern for provider calls
//!
//! ```text
//! CLOSED --(failures >= threshold)--> OPEN --(cooldown)--> HALF_OPEN
//!   ^                                  ^                      |
//!   |                                  +------(failure)-------+
//!   +----------------------(success)--------------------------+
//! ```
//!
//! While HALF_OPEN exactly one probe call is let through.
use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls are rejected without I/O
    Open,
    /// One probe call decides whether to close again
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl BreakerConfig {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

/// Per-provider breaker state
#[derive(Debug, Clone)]
struct BreakerState {
    config: BreakerConfig,
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    opened_at: Option<Instant>,
    /// Set while the half-open probe is outstanding
    probe_started: Option<Instant>,
}

impl BreakerState {
    fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure: None,
            opened_at: None,
            probe_started: None,
        }
    }

    fn allow(&mut self, now: Instant) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = self
                    .opened_at
                    .map(|at| now.duration_since(at) >= self.config.cooldown)
                    .unwrap_or(true);
                if cooled {
                    self.state = CircuitState::HalfOpen;
                    self.probe_started = Some(now);
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => match self.probe_started {
                // A probe abandoned mid-flight must not wedge the breaker
                Some(started) if now.duration_since(started) < self.config.cooldown => false,
                _ => {
                    self.probe_started = Some(now);
                    true
                }
            },
        }
    }

    fn record_success(&mut self) {
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => self.close(),
            CircuitState::Open => {
                // Late success from a call admitted before the circuit opened
            }
        }
    }

    fn record_failure(&mut self, now: Instant) {
        self.last_failure = Some(now);
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.config.failure_threshold {
                    self.open(now);
                }
            }
            CircuitState::HalfOpen => self.open(now),
            CircuitState::Open => {}
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.probe_started = None;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
        self.probe_started = None;
    }
}

/// Read-only view for health endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub provider: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub cooldown_ms: u64,
}

/// Breakers for every provider, shared across tasks and requests
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    default_config: BreakerConfig,
    breakers: DashMap<String, BreakerState>,
}

impl CircuitBreakerRegistry {
    pub fn new(default_config: BreakerConfig) -> Self {
        Self {
            default_config,
            breakers: DashMap::new(),
        }
    }

    /// Set (or reset) a provider's thresholds
    pub fn configure(&self, provider: &str, config: BreakerConfig) {
        self.breakers
            .insert(provider.to_string(), BreakerState::new(config));
    }

    pub fn allow(&self, provider: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .breakers
            .entry(provider.to_string())
            .or_insert_with(|| BreakerState::new(self.default_config));
        let before = entry.state;
        let allowed = entry.allow(now);
        if before == CircuitState::Open && entry.state == CircuitState::HalfOpen {
            info!(provider, "circuit half-open, letting one probe through");
        }
        allowed
    }

    pub fn record_success(&self, provider: &str) {
        if let Some(mut entry) = self.breakers.get_mut(provider) {
            let before = entry.state;
            entry.record_success();
            if before != CircuitState::Closed && entry.state == CircuitState::Closed {
                info!(provider, "circuit closed after successful probe");
            }
        }
    }

    pub fn record_failure(&self, provider: &str) {
        let now = Instant::now();
        let mut entry = self
            .breakers
            .entry(provider.to_string())
            .or_insert_with(|| BreakerState::new(self.default_config));
        let before = entry.state;
        entry.record_failure(now);
        if before != CircuitState::Open && entry.state == CircuitState::Open {
            warn!(
                provider,
                failures = entry.consecutive_failures,
                cooldown_ms = entry.config.cooldown.as_millis() as u64,
                "circuit opened"
            );
        }
    }

    pub fn state(&self, provider: &str) -> CircuitState {
        self.breakers
            .get(provider)
            .map(|b| b.state)
            .unwrap_or(CircuitState::Closed)
    }

    pub fn consecutive_failures(&self, provider: &str) -> u32 {
        self.breakers
            .get(provider)
            .map(|b| b.consecutive_failures)
            .unwrap_or(0)
    }

    /// Last recorded failure time, if any
    pub fn last_failure(&self, provider: &str) -> Option<Instant> {
        self.breakers.get(provider).and_then(|b| b.last_failure)
    }

    pub fn snapshot(&self) -> Vec<BreakerSnapshot> {
        let mut out: Vec<BreakerSnapshot> = self
            .breakers
            .iter()
            .map(|entry| BreakerSnapshot {
                provider: entry.key().clone(),
                state: entry.state,
                consecutive_failures: entry.consecutive_failures,
                failure_threshold: entry.config.failure_threshold,
                cooldown_ms: entry.config.cooldown.as_millis() as u64,
            })
            .collect();
        out.sort_by(|a, b| a.provider.cmp(&b.provider));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(threshold: u32, cooldown_ms: u64) -> CircuitBreakerRegistry {
        let reg = CircuitBreakerRegistry::default();
        reg.configure("search", BreakerConfig::new(threshold, Duration::from_millis(cooldown_ms)));
        reg
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold() {
        let reg = registry(3, 1_000);

        for _ in 0..2 {
            assert!(reg.allow("search"));
            reg.record_failure("search");
        }
        assert_eq!(reg.state("search"), CircuitState::Closed);

        reg.record_failure("search");
        assert_eq!(reg.state("search"), CircuitState::Open);
        assert!(!reg.allow("search"));
        assert!(reg.last_failure("search").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_probe_then_close() {
        let reg = registry(2, 1_000);
        reg.record_failure("search");
        reg.record_failure("search");

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(!reg.allow("search"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(reg.allow("search"));
        assert_eq!(reg.state("search"), CircuitState::HalfOpen);
        assert!(!reg.allow("search"));

        reg.record_success("search");
        assert_eq!(reg.state("search"), CircuitState::Closed);
        assert!(reg.allow("search"));
        assert!(reg.allow("search"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_reopens() {
        let reg = registry(1, 500);
        reg.record_failure("search");
        assert_eq!(reg.state("search"), CircuitState::Open);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(reg.allow("search"));
        reg.record_failure("search");
        assert_eq!(reg.state("search"), CircuitState::Open);

        // Cooldown restarts from the failed probe
        tokio::time::advance(Duration::from_millis(499)).await;
        assert!(!reg.allow("search"));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(reg.allow("search"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_probe_expires() {
        let reg = registry(1, 100);
        reg.record_failure("search");
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(reg.allow("search"));

        // Probe never reports back
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(reg.allow("search"));
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let reg = registry(3, 1_000);
        reg.record_failure("search");
        reg.record_failure("search");
        assert_eq!(reg.consecutive_failures("search"), 2);

        reg.record_success("search");
        assert_eq!(reg.consecutive_failures("search"), 0);
        reg.record_failure("search");
        assert_eq!(reg.state("search"), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_providers_are_independent() {
        let reg = CircuitBreakerRegistry::new(BreakerConfig::new(1, Duration::from_secs(60)));
        reg.record_failure("events");
        assert!(!reg.allow("events"));
        assert!(reg.allow("weather"));

        let snapshot = reg.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].provider, "events");
        assert_eq!(snapshot[0].state, CircuitState::Open);
    }
}
