//! Guide Providers: adapters for the four external content sources
//!
//! Each adapter implements `guide_core::ContentProvider` on top of a narrow
//! client trait (see [`clients`]) and runs every call through
//! [`adapter::Guarded`]:
//!
//! ```text
//! disabled? → breaker.allow? → cache hit? → timeout(retry(call)) → cache fill
//! ```
//!
//! The reqwest-backed clients live in [`http`]; [`build_registry`] wires
//! them from an `EngineConfig`.

pub mod adapter;
pub mod clients;
pub mod error;
pub mod events;
pub mod http;
pub mod places;
pub mod search;
pub mod weather;

pub use adapter::{Guarded, Resilience, RetryPredicate};
pub use clients::{EventsClient, PlacesClient, SearchClient, WeatherClient};
pub use error::ClientError;
pub use events::EventsAdapter;
pub use http::{HttpEventsClient, HttpPlacesClient, HttpSearchClient, HttpWeatherClient};
pub use places::PlacesAdapter;
pub use search::{build_prompt, parse_search_reply, SearchAdapter};
pub use weather::WeatherAdapter;

use guide_core::{providers, EngineConfig, ProviderRegistry, ProviderSettings};
use std::sync::Arc;
use std::time::Duration;

/// The four collaborators an engine needs
#[derive(Clone)]
pub struct Clients {
    pub search: Arc<dyn SearchClient>,
    pub weather: Arc<dyn WeatherClient>,
    pub places: Arc<dyn PlacesClient>,
    pub events: Arc<dyn EventsClient>,
}

impl Clients {
    /// reqwest clients for every provider, sharing one connection pool
    pub fn http(config: &EngineConfig, shared: &Resilience) -> Result<Self, ClientError> {
        let longest = providers::ALL
            .iter()
            .map(|name| config.task_timeout(name))
            .max()
            .unwrap_or(Duration::from_secs(60));
        let http = http::http_client(longest)?;
        let p = &config.providers;
        Ok(Self {
            search: Arc::new(HttpSearchClient::new(http.clone(), &p.search)),
            weather: Arc::new(
                HttpWeatherClient::new(http.clone(), &p.weather).with_cache(Arc::clone(&shared.cache)),
            ),
            places: Arc::new(HttpPlacesClient::new(http.clone(), &p.places)),
            events: Arc::new(HttpEventsClient::new(http, &p.events)),
        })
    }
}

/// The adapter gives up slightly before the orchestrator's per-task timeout,
/// so its own failure (and breaker bookkeeping) lands first
pub fn adapter_budget(task_timeout: Duration) -> Duration {
    task_timeout.mul_f64(0.9)
}

fn guard(name: &str, settings: &ProviderSettings, config: &EngineConfig, shared: &Resilience) -> Guarded {
    Guarded::from_settings(
        name,
        settings,
        adapter_budget(config.task_timeout(name)),
        shared.clone(),
    )
}

/// Register one adapter per provider, configured from `config`
pub fn build_registry(config: &EngineConfig, clients: Clients, shared: &Resilience) -> ProviderRegistry {
    let p = &config.providers;
    ProviderRegistry::new()
        .with(Arc::new(SearchAdapter::new(
            clients.search,
            guard(providers::SEARCH, &p.search, config, shared),
        )))
        .with(Arc::new(WeatherAdapter::new(
            clients.weather,
            guard(providers::WEATHER, &p.weather, config, shared),
        )))
        .with(Arc::new(PlacesAdapter::new(
            clients.places,
            guard(providers::PLACES, &p.places, config, shared),
        )))
        .with(Arc::new(EventsAdapter::new(
            clients.events,
            guard(providers::EVENTS, &p.events, config, shared),
        )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_budget_under_task_timeout() {
        let task = Duration::from_secs(10);
        assert_eq!(adapter_budget(task), Duration::from_secs(9));
        assert!(adapter_budget(task) < task);
    }
}
