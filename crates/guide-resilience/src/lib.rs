//! Guide Resilience: the shared state that outlives a single request
//!
//! - [`cache`]: namespaced, TTL-bounded cache with order-independent keys
//! - [`breaker`]: per-provider circuit breakers
//! - [`retry`]: one retry/backoff policy composed into every adapter
//!
//! Both the cache and the breaker registry are constructed explicitly and
//! passed by reference, so tests get fresh instances per case.

pub mod breaker;
pub mod cache;
pub mod retry;

pub use breaker::{BreakerConfig, BreakerSnapshot, CircuitBreakerRegistry, CircuitState};
pub use cache::{
    cache_key, namespaces, CacheBackend, CacheEntry, CacheError, CacheStats, CacheStore,
    InMemoryBackend,
};
pub use retry::RetryPolicy;
