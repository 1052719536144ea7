//! Guarded call: breaker → cache → retry/backoff → cache fill
//!
//! Every adapter funnels its network call through [`Guarded::execute`], so the
//! breaker and cache bookkeeping is identical across providers and no client
//! error escapes as anything but a `ProviderResult`.
use crate::error::ClientError;
use guide_core::{FailureKind, ProviderPayload, ProviderResult, ProviderSettings};
use guide_resilience::{BreakerConfig, CacheStore, CircuitBreakerRegistry, RetryPolicy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Shared, cross-request state handed to every adapter
#[derive(Clone)]
pub struct Resilience {
    pub cache: Arc<CacheStore>,
    pub breakers: Arc<CircuitBreakerRegistry>,
}

impl Resilience {
    pub fn new(cache: Arc<CacheStore>, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        Self { cache, breakers }
    }

    /// Fresh in-memory cache and default breakers
    pub fn fresh() -> Self {
        Self::new(
            Arc::new(CacheStore::in_memory()),
            Arc::new(CircuitBreakerRegistry::default()),
        )
    }
}

pub type RetryPredicate = fn(&ClientError) -> bool;

pub struct Guarded {
    name: String,
    enabled: bool,
    budget: Duration,
    retry: RetryPolicy,
    retryable: RetryPredicate,
    shared: Resilience,
}

impl Guarded {
    pub fn new(name: impl Into<String>, shared: Resilience) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            budget: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            retryable: ClientError::is_transient,
            shared,
        }
    }

    /// Build from config, registering the provider's breaker thresholds
    pub fn from_settings(
        name: impl Into<String>,
        settings: &ProviderSettings,
        budget: Duration,
        shared: Resilience,
    ) -> Self {
        let name = name.into();
        shared.breakers.configure(
            &name,
            BreakerConfig::new(
                settings.breaker.failure_threshold,
                Duration::from_millis(settings.breaker.cooldown_ms),
            ),
        );
        let retry = RetryPolicy::new(
            settings.retry.max_attempts,
            Duration::from_millis(settings.retry.base_delay_ms),
            Duration::from_millis(settings.retry.max_delay_ms),
        );
        Self {
            enabled: settings.enabled,
            budget,
            retry,
            ..Self::new(name, shared)
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_retryable(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn execute<T, F, Fut>(
        &self,
        namespace: &str,
        params: &Value,
        call: F,
        into_payload: fn(T) -> ProviderPayload,
    ) -> ProviderResult
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if !self.enabled {
            return ProviderResult::failure(
                FailureKind::Disabled,
                format!("{} provider is disabled", self.name),
            );
        }

        if !self.shared.breakers.allow(&self.name) {
            debug!(provider = %self.name, "circuit open, skipping call");
            return ProviderResult::failure(
                FailureKind::CircuitOpen,
                format!("{} circuit is open", self.name),
            );
        }

        if let Some(cached) = self.shared.cache.get(namespace, params).await {
            match serde_json::from_value::<T>(cached) {
                Ok(value) => return ProviderResult::success(into_payload(value)),
                Err(e) => warn!(provider = %self.name, error = %e, "discarding undecodable cache entry"),
            }
        }

        let started = Instant::now();
        let attempts = self.retry.run(&self.name, call, self.retryable);
        match tokio::time::timeout(self.budget, attempts).await {
            Ok(Ok(value)) => {
                match serde_json::to_value(&value) {
                    Ok(json) => self.shared.cache.set(namespace, params, json, None).await,
                    Err(e) => warn!(provider = %self.name, error = %e, "result not cacheable"),
                }
                self.shared.breakers.record_success(&self.name);
                info!(
                    provider = %self.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "provider call succeeded"
                );
                ProviderResult::success(into_payload(value))
            }
            Ok(Err(err)) => {
                self.shared.breakers.record_failure(&self.name);
                ProviderResult::failure(err.kind(), err.to_string())
            }
            Err(_) => {
                self.shared.breakers.record_failure(&self.name);
                warn!(
                    provider = %self.name,
                    budget_ms = self.budget.as_millis() as u64,
                    "provider call exceeded its budget"
                );
                ProviderResult::Timeout
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guide_core::EventRecord;
    use guide_resilience::CircuitState;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn events(names: &[&str]) -> Vec<EventRecord> {
        names
            .iter()
            .map(|n| EventRecord {
                name: n.to_string(),
                date: None,
                venue: None,
                category: None,
                url: None,
                description: String::new(),
            })
            .collect()
    }

    fn guarded(shared: &Resilience) -> Guarded {
        shared
            .breakers
            .configure("events", BreakerConfig::new(2, Duration::from_secs(30)));
        Guarded::new("events", shared.clone()).with_retry(RetryPolicy::new(
            3,
            Duration::from_millis(10),
            Duration::from_millis(10),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_fills_cache() {
        let shared = Resilience::fresh();
        let adapter = guarded(&shared);
        let calls = AtomicU32::new(0);
        let params = json!({"destination": "Paris"});

        for _ in 0..2 {
            let result = adapter
                .execute(
                    "events",
                    &params,
                    |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Ok(events(&["Fête de la Musique"])) }
                    },
                    ProviderPayload::Events,
                )
                .await;
            assert!(result.is_success());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(shared.cache.stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_stops_and_trips_breaker() {
        let shared = Resilience::fresh();
        let adapter = guarded(&shared);
        let calls = AtomicU32::new(0);
        let params = json!({"destination": "Paris"});

        for _ in 0..2 {
            let result = adapter
                .execute(
                    "events",
                    &params,
                    |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Err::<Vec<EventRecord>, _>(ClientError::Auth("bad key".into())) }
                    },
                    ProviderPayload::Events,
                )
                .await;
            assert!(matches!(
                result,
                ProviderResult::Failure { kind: FailureKind::Auth, .. }
            ));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(shared.breakers.state("events"), CircuitState::Open);

        let result = adapter
            .execute(
                "events",
                &params,
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(events(&["never fetched"])) }
                },
                ProviderPayload::Events,
            )
            .await;
        assert!(matches!(
            result,
            ProviderResult::Failure { kind: FailureKind::CircuitOpen, .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried() {
        let shared = Resilience::fresh();
        let adapter = guarded(&shared);
        let calls = AtomicU32::new(0);

        let result = adapter
            .execute(
                "events",
                &json!({"destination": "Rome"}),
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 3 {
                            Err(ClientError::Upstream { status: 502, message: "bad gateway".into() })
                        } else {
                            Ok(events(&["Estate Romana"]))
                        }
                    }
                },
                ProviderPayload::Events,
            )
            .await;

        assert!(result.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(shared.breakers.consecutive_failures("events"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exceeded_is_timeout() {
        let shared = Resilience::fresh();
        let adapter = guarded(&shared).with_budget(Duration::from_millis(100));

        let result = adapter
            .execute(
                "events",
                &json!({"destination": "Oslo"}),
                |_| async {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Ok(events(&[]))
                },
                ProviderPayload::Events,
            )
            .await;

        assert!(result.is_timeout());
        assert_eq!(shared.breakers.consecutive_failures("events"), 1);
    }

    #[tokio::test]
    async fn test_disabled_skips_everything() {
        let shared = Resilience::fresh();
        let adapter = guarded(&shared).disabled();

        let result = adapter
            .execute(
                "events",
                &json!({}),
                |_| async { Ok(events(&["x"])) },
                ProviderPayload::Events,
            )
            .await;

        assert!(matches!(
            result,
            ProviderResult::Failure { kind: FailureKind::Disabled, .. }
        ));
        assert_eq!(shared.breakers.consecutive_failures("events"), 0);
    }
}
