//! Provider contract: the single boundary every content source sits behind
use crate::context::GenerationContext;
use crate::data_model::{DailyForecast, EventRecord, PlaceRecord, SearchContent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Typed payload, one variant per provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "data", rename_all = "snake_case")]
pub enum ProviderPayload {
    Search(SearchContent),
    Weather(Vec<DailyForecast>),
    Places(Vec<PlaceRecord>),
    Events(Vec<EventRecord>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Auth,
    RateLimited,
    Network,
    Upstream,
    InvalidResponse,
    CircuitOpen,
    Disabled,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Auth => "auth",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::Network => "network",
            FailureKind::Upstream => "upstream",
            FailureKind::InvalidResponse => "invalid_response",
            FailureKind::CircuitOpen => "circuit_open",
            FailureKind::Disabled => "disabled",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one provider call. Exactly one variant, never a raw error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProviderResult {
    Success { payload: ProviderPayload },
    Failure { kind: FailureKind, message: String },
    Timeout,
}

impl ProviderResult {
    pub fn success(payload: ProviderPayload) -> Self {
        ProviderResult::Success { payload }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ProviderResult::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProviderResult::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ProviderResult::Failure { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderResult::Timeout)
    }

    pub fn payload(&self) -> Option<&ProviderPayload> {
        match self {
            ProviderResult::Success { payload } => Some(payload),
            _ => None,
        }
    }

    /// Short outcome label used in timing metadata
    pub fn outcome_label(&self) -> String {
        match self {
            ProviderResult::Success { .. } => "success".to_string(),
            ProviderResult::Failure { kind, .. } => format!("failure:{}", kind),
            ProviderResult::Timeout => "timeout".to_string(),
        }
    }
}

impl fmt::Display for ProviderResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProviderResult::Success { .. } => write!(f, "success"),
            ProviderResult::Failure { kind, message } => write!(f, "{}: {}", kind, message),
            ProviderResult::Timeout => write!(f, "timed out"),
        }
    }
}

/// Descriptor for one provider call in a fan-out batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTask {
    pub name: String,
    pub timeout: Duration,
    /// A critical task failing aborts the whole request
    pub critical: bool,
}

impl ProviderTask {
    pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            timeout,
            critical: false,
        }
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// Contract for a content source behind breaker, cache and retry
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Provider name (ex: "search"), matched against task names
    fn name(&self) -> &str;

    /// Fetch content for the context. Must not panic and must not
    /// surface errors other than as `ProviderResult::Failure`.
    async fn fetch(&self, ctx: &GenerationContext) -> ProviderResult;
}

/// Providers available to the orchestrator, keyed by name
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ContentProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn ContentProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ContentProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
