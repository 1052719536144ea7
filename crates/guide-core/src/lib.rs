//! Guide Core: data model, provider contract and task orchestrator
//!
//! Everything the other guide crates share lives here: the request context,
//! the typed provider payloads, the `Guide` aggregate, the unified error
//! model, engine configuration and the deadline-bounded fan-out runner.
//!
//! # Flow
//!
//! ```text
//! GuideRequest → GenerationContext → TaskOrchestrator::run_all → BatchOutcome
//!                      ↓                        ↓                      ↓
//!                   persona            ProviderResult per task   critical check
//! ```

pub mod config;
pub mod context;
pub mod data_model;
pub mod error;
pub mod progress;
pub mod provider;
pub mod runner;

pub use config::{BreakerSettings, EngineConfig, ProviderSettings, ProvidersConfig, RetrySettings};
pub use context::{duration_days, GenerationContext};
pub use data_model::{
    normalize_name,
    BudgetTier, DailyForecast, DayPlan, EventRecord, GroupType, Guide, GuideRequest,
    Neighborhood, PersonaTag, Pace, PlaceCategory, PlaceRecord, PracticalInfo, ProviderTiming,
    Recommendation, SearchContent, SearchDay, TimingMetadata, TravelPreferences,
    ValidationReport, ValidationRule, Violation, WeatherAnnotation,
};
pub use error::GuideError;
pub use progress::{ProgressEvent, ProgressReceiver, ProgressReporter, ProgressSender, ProgressStage};
pub use provider::{
    ContentProvider, FailureKind, ProviderPayload, ProviderRegistry, ProviderResult, ProviderTask,
};
pub use runner::{BatchOutcome, TaskOrchestrator, TaskRecord};

/// Canonical provider names used by tasks, breakers and cache namespaces
pub mod providers {
    pub const SEARCH: &str = "search";
    pub const WEATHER: &str = "weather";
    pub const PLACES: &str = "places";
    pub const EVENTS: &str = "events";

    /// All providers in fan-out order
    pub const ALL: [&str; 4] = [SEARCH, WEATHER, PLACES, EVENTS];
}

/// Engine version stamped into guide metadata
pub const GUIDE_ENGINE_VERSION: &str = "1.0.0";
