//! Engine configuration
//!
//! Loaded from YAML, then overlaid with credentials from the environment.
//! `validate` runs before any provider task is scheduled.
use crate::error::GuideError;
use crate::provider::ProviderTask;
use crate::providers;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Retry knobs shared by every provider adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    4_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSettings {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_cooldown_ms() -> u64 {
    60_000
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// Settings for one external provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the provider API
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Model name, only meaningful for the search/LLM provider
    #[serde(default)]
    pub model: Option<String>,

    /// Overrides the provider's default timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub breaker: BreakerSettings,
}

fn default_true() -> bool {
    true
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            api_key: None,
            model: None,
            timeout_ms: None,
            retry: RetrySettings::default(),
            breaker: BreakerSettings::default(),
        }
    }
}

impl ProviderSettings {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn has_key(&self) -> bool {
        self.api_key.as_deref().map(|k| !k.trim().is_empty()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub search: ProviderSettings,
    #[serde(default)]
    pub weather: ProviderSettings,
    #[serde(default)]
    pub places: ProviderSettings,
    #[serde(default)]
    pub events: ProviderSettings,
}

impl ProvidersConfig {
    pub fn get(&self, name: &str) -> Option<&ProviderSettings> {
        match name {
            providers::SEARCH => Some(&self.search),
            providers::WEATHER => Some(&self.weather),
            providers::PLACES => Some(&self.places),
            providers::EVENTS => Some(&self.events),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ProviderSettings> {
        match name {
            providers::SEARCH => Some(&mut self.search),
            providers::WEATHER => Some(&mut self.weather),
            providers::PLACES => Some(&mut self.places),
            providers::EVENTS => Some(&mut self.events),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Global budget for the provider fan-out
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Tasks whose failure aborts the request
    #[serde(default = "default_critical")]
    pub critical_providers: Vec<String>,

    /// Validation profile name ("standard" | "lenient")
    #[serde(default = "default_profile")]
    pub validation_profile: String,

    /// Per-namespace cache TTL overrides, in seconds
    #[serde(default)]
    pub cache_ttl_secs: BTreeMap<String, u64>,
}

fn default_deadline_ms() -> u64 {
    60_000
}

fn default_critical() -> Vec<String> {
    vec![providers::SEARCH.to_string()]
}

fn default_profile() -> String {
    "standard".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            providers: ProvidersConfig::default(),
            critical_providers: default_critical(),
            validation_profile: default_profile(),
            cache_ttl_secs: BTreeMap::new(),
        }
    }
}

/// Environment variable holding each provider's credential
pub fn api_key_env(provider: &str) -> String {
    format!("GUIDE_{}_API_KEY", provider.to_uppercase())
}

/// Environment variable overriding each provider's endpoint
pub fn endpoint_env(provider: &str) -> String {
    format!("GUIDE_{}_ENDPOINT", provider.to_uppercase())
}

impl EngineConfig {
    /// Load config from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, GuideError> {
        serde_yaml::from_str(yaml).map_err(|e| GuideError::configuration("yaml", e.to_string()))
    }

    pub fn from_file(path: &str) -> Result<Self, GuideError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GuideError::configuration("path", format!("{}: {}", path, e)))?;
        Self::from_yaml(&raw)
    }

    /// Overlay credentials and endpoints from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay using an arbitrary lookup; unset or blank values are ignored
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in providers::ALL {
            let key = lookup(&api_key_env(name)).filter(|v| !v.trim().is_empty());
            let endpoint = lookup(&endpoint_env(name)).filter(|v| !v.trim().is_empty());
            if let Some(settings) = self.providers.get_mut(name) {
                if let Some(key) = key {
                    settings.api_key = Some(key);
                }
                if let Some(endpoint) = endpoint {
                    settings.endpoint = Some(endpoint);
                }
            }
        }
        if let Some(deadline) = lookup("GUIDE_DEADLINE_MS").and_then(|v| v.parse().ok()) {
            self.deadline_ms = deadline;
        }
    }

    /// Reject configurations that would fail at request time
    pub fn validate(&self) -> Result<(), GuideError> {
        if self.deadline_ms == 0 {
            return Err(GuideError::configuration("deadline_ms", "must be greater than zero"));
        }
        for name in providers::ALL {
            let Some(settings) = self.providers.get(name) else {
                continue;
            };
            if !settings.enabled {
                continue;
            }
            if !settings.has_key() {
                return Err(GuideError::configuration(
                    format!("providers.{}.api_key", name),
                    format!("missing credentials (set {})", api_key_env(name)),
                ));
            }
            if settings.retry.max_attempts == 0 {
                return Err(GuideError::configuration(
                    format!("providers.{}.retry.max_attempts", name),
                    "must be at least 1",
                ));
            }
            if settings.breaker.failure_threshold == 0 {
                return Err(GuideError::configuration(
                    format!("providers.{}.breaker.failure_threshold", name),
                    "must be at least 1",
                ));
            }
        }
        for name in &self.critical_providers {
            if self.providers.get(name).is_none() {
                return Err(GuideError::configuration(
                    "critical_providers",
                    format!("unknown provider '{}'", name),
                ));
            }
        }
        Ok(())
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Default timeouts; the LLM call is by far the slowest
    pub fn task_timeout(&self, name: &str) -> Duration {
        let configured = self.providers.get(name).and_then(|s| s.timeout_ms);
        let default_ms = match name {
            providers::SEARCH => 45_000,
            providers::WEATHER => 10_000,
            _ => 15_000,
        };
        Duration::from_millis(configured.unwrap_or(default_ms))
    }

    /// One task per known provider; disabled ones still run and report `Disabled`
    pub fn tasks(&self) -> Vec<ProviderTask> {
        providers::ALL
            .iter()
            .map(|name| {
                let task = ProviderTask::new(*name, self.task_timeout(name));
                if self.critical_providers.iter().any(|c| c == name) {
                    task.critical()
                } else {
                    task
                }
            })
            .collect()
    }

    pub fn cache_ttl(&self, namespace: &str) -> Option<Duration> {
        self.cache_ttl_secs.get(namespace).map(|s| Duration::from_secs(*s))
    }

    /// Config with dummy keys for every provider, for tests and local runs
    pub fn with_all_keys(key: &str) -> Self {
        let mut config = Self::default();
        for name in providers::ALL {
            if let Some(settings) = config.providers.get_mut(name) {
                settings.api_key = Some(key.to_string());
            }
        }
        config
    }
}
