//! Cache Store
//!
//! Keys are `"{namespace}:{blake3}"` over a canonical rendering of the
//! normalized parameters, so logically identical parameter sets collide no
//! matter how they were built. The cache is never a correctness dependency:
//! a failing backend reads as a miss and writes as a no-op.
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Namespaces and their default TTLs
pub mod namespaces {
    use std::time::Duration;

    pub const GEOCODE: &str = "geocode";
    pub const PLACES: &str = "places";
    pub const EVENTS: &str = "events";
    pub const SEARCH: &str = "search";
    pub const WEATHER: &str = "weather";

    const HOUR: u64 = 60 * 60;
    const DAY: u64 = 24 * HOUR;

    /// Stable geodata lives for weeks, live weather for an hour
    pub fn default_ttl(namespace: &str) -> Duration {
        let secs = match namespace {
            GEOCODE => 30 * DAY,
            PLACES => 7 * DAY,
            EVENTS => 12 * HOUR,
            SEARCH => DAY,
            WEATHER => HOUR,
            _ => HOUR,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("CACHE/UNAVAILABLE: {0}")]
    Unavailable(String),
    #[error("CACHE/SERIALIZE: {0}")]
    Serialize(String),
}

/// A cached value. Replaced wholesale on `set`, never edited in place.
#[derive(Debug)]
pub struct CacheEntry {
    pub namespace: String,
    pub key: String,
    pub value: Value,
    pub created_at: Instant,
    pub expires_at: Instant,
    access_count: AtomicU64,
}

impl CacheEntry {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, value: Value, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value,
            created_at: now,
            expires_at: now + ttl,
            access_count: AtomicU64::new(0),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn touch(&self) -> u64 {
        self.access_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }
}

/// Storage behind the cache. Implementations may fail; the store absorbs it.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>, CacheError>;
    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
    /// Drop expired entries, returning how many went
    async fn purge_expired(&self) -> Result<usize, CacheError>;
}

/// Process-local backend
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: DashMap<String, Arc<CacheEntry>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>, CacheError> {
        let now = Instant::now();
        let found = self.entries.get(key).map(|e| Arc::clone(e.value()));
        match found {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove_if(key, |_, e| e.is_expired(now));
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.entries.insert(entry.key.clone(), Arc::new(entry));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        Ok(before.saturating_sub(self.entries.len()))
    }
}

/// Hit/miss/error counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    ttl_overrides: HashMap<String, Duration>,
    counters: Counters,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            ttl_overrides: HashMap::new(),
            counters: Counters::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    /// Override a namespace's default TTL
    pub fn with_ttl(mut self, namespace: impl Into<String>, ttl: Duration) -> Self {
        self.ttl_overrides.insert(namespace.into(), ttl);
        self
    }

    pub fn ttl_for(&self, namespace: &str) -> Duration {
        self.ttl_overrides
            .get(namespace)
            .copied()
            .unwrap_or_else(|| namespaces::default_ttl(namespace))
    }

    pub async fn get(&self, namespace: &str, params: &Value) -> Option<Value> {
        let key = cache_key(namespace, params);
        match self.backend.get(&key).await {
            Ok(Some(entry)) if !entry.is_expired(Instant::now()) => {
                let hits = entry.touch();
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(namespace, key = %key, hits, "cache hit");
                Some(entry.value.clone())
            }
            Ok(_) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(namespace, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn set(&self, namespace: &str, params: &Value, value: Value, ttl: Option<Duration>) {
        let key = cache_key(namespace, params);
        let ttl = ttl.unwrap_or_else(|| self.ttl_for(namespace));
        let entry = CacheEntry::new(namespace, key, value, ttl);
        if let Err(e) = self.backend.set(entry).await {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            warn!(namespace, error = %e, "cache write failed, skipping");
        }
    }

    pub async fn delete(&self, namespace: &str, params: &Value) -> bool {
        let key = cache_key(namespace, params);
        match self.backend.delete(&key).await {
            Ok(removed) => removed,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(namespace, error = %e, "cache delete failed");
                false
            }
        }
    }

    /// Batch read; results line up with `params`
    pub async fn get_many(&self, namespace: &str, params: &[Value]) -> Vec<Option<Value>> {
        let mut out = Vec::with_capacity(params.len());
        for p in params {
            out.push(self.get(namespace, p).await);
        }
        out
    }

    /// Batch write of (params, value) pairs sharing one TTL
    pub async fn set_many(&self, namespace: &str, items: Vec<(Value, Value)>, ttl: Option<Duration>) {
        for (params, value) in items {
            self.set(namespace, &params, value, ttl).await;
        }
    }

    pub async fn purge_expired(&self) -> usize {
        match self.backend.purge_expired().await {
            Ok(n) => n,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "cache purge failed");
                0
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }
}

/// Content-derived key for a parameter set
pub fn cache_key(namespace: &str, params: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(&normalize(params), &mut canonical);
    format!("{}:{}", namespace, blake3::hash(canonical.as_bytes()).to_hex())
}

/// Trim and lowercase strings; sort arrays of scalars
fn normalize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_lowercase()),
        Value::Array(items) => {
            let mut items: Vec<Value> = items.iter().map(normalize).collect();
            if items.iter().all(|v| !v.is_object() && !v.is_array()) {
                items.sort_by_key(|v| v.to_string());
            }
            Value::Array(items)
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.trim().to_lowercase(), normalize(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// JSON with object keys sorted, independent of map insertion order
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn get(&self, _key: &str) -> Result<Option<Arc<CacheEntry>>, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }
        async fn set(&self, _entry: CacheEntry) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }
        async fn purge_expired(&self) -> Result<usize, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn test_key_ignores_parameter_order() {
        let a = json!({"destination": "Paris", "start": "2025-06-01", "interests": ["food", "art"]});
        let b = json!({"interests": ["art", "food"], "start": "2025-06-01", "destination": " paris "});
        assert_eq!(cache_key("search", &a), cache_key("search", &b));
    }

    #[test]
    fn test_key_separates_namespaces_and_values() {
        let p = json!({"destination": "Paris"});
        assert_ne!(cache_key("search", &p), cache_key("places", &p));
        assert_ne!(
            cache_key("search", &p),
            cache_key("search", &json!({"destination": "Rome"}))
        );
        assert!(cache_key("weather", &p).starts_with("weather:"));
    }

    #[test]
    fn test_default_ttls_differ_by_namespace() {
        assert!(namespaces::default_ttl(namespaces::GEOCODE) > namespaces::default_ttl(namespaces::PLACES));
        assert!(namespaces::default_ttl(namespaces::PLACES) > namespaces::default_ttl(namespaces::WEATHER));
        assert_eq!(namespaces::default_ttl(namespaces::WEATHER), Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_until_ttl() {
        let cache = CacheStore::in_memory();
        let params = json!({"destination": "Paris"});

        cache.set("weather", &params, json!({"high": 72}), Some(Duration::from_secs(60))).await;
        assert_eq!(cache.get("weather", &params).await, Some(json!({"high": 72})));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("weather", &params).await.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("weather", &params).await, None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_namespace_ttl_override() {
        let cache = CacheStore::in_memory().with_ttl("search", Duration::from_secs(5));
        let params = json!({"q": "x"});
        cache.set("search", &params, json!(1), None).await;

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get("search", &params).await, None);
    }

    #[tokio::test]
    async fn test_set_replaces_and_delete_removes() {
        let cache = CacheStore::in_memory();
        let params = json!({"q": "louvre"});

        cache.set("places", &params, json!("first"), None).await;
        cache.set("places", &params, json!("second"), None).await;
        assert_eq!(cache.get("places", &params).await, Some(json!("second")));

        assert!(cache.delete("places", &params).await);
        assert!(!cache.delete("places", &params).await);
        assert_eq!(cache.get("places", &params).await, None);
    }

    #[tokio::test]
    async fn test_batch_operations() {
        let cache = CacheStore::in_memory();
        let items = vec![
            (json!({"id": 1}), json!("one")),
            (json!({"id": 2}), json!("two")),
        ];
        cache.set_many("events", items, None).await;

        let got = cache
            .get_many("events", &[json!({"id": 2}), json!({"id": 3}), json!({"id": 1})])
            .await;
        assert_eq!(got, vec![Some(json!("two")), None, Some(json!("one"))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let backend = Arc::new(InMemoryBackend::new());
        let cache = CacheStore::new(backend.clone());
        cache.set("weather", &json!({"a": 1}), json!(1), Some(Duration::from_secs(1))).await;
        cache.set("places", &json!({"a": 1}), json!(1), None).await;

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_broken_backend_degrades() {
        let cache = CacheStore::new(Arc::new(BrokenBackend));
        let params = json!({"q": "x"});

        cache.set("search", &params, json!("v"), None).await;
        assert_eq!(cache.get("search", &params).await, None);
        assert!(!cache.delete("search", &params).await);
        assert_eq!(cache.stats().errors, 3);
    }
}
