//! Guide Engine: one request from context to persisted guide
//!
//! ```text
//! context ─▶ persona ─▶ run_all ─▶ critical check ─▶ weather ─▶ assemble ─▶ gate ─▶ finalize ─▶ store
//!    5%        15%       20-70%                        75%        85%        92%       100%
//! ```
use crate::store::{InMemoryTripStore, TripState, TripStore};
use chrono::Utc;
use guide_assembly::{assemble, draft_itinerary, finalize, forecasts};
use guide_core::{
    EngineConfig, GenerationContext, Guide, GuideError, GuideRequest, ProgressReporter,
    ProgressSender, ProgressStage, ProviderTask, TaskOrchestrator, ValidationReport,
};
use guide_personalize::{persona, WeatherRules};
use guide_providers::{build_registry, Clients, Resilience};
use guide_quality::{GateOutcome, QualityGate};
use guide_resilience::{BreakerSnapshot, CacheStats, CacheStore, CircuitBreakerRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct GuideEngine {
    config: EngineConfig,
    orchestrator: TaskOrchestrator,
    tasks: Vec<ProviderTask>,
    weather_rules: WeatherRules,
    gate: QualityGate,
    shared: Resilience,
    store: Arc<dyn TripStore>,
}

impl GuideEngine {
    /// Wire an engine around explicit clients and shared state. The config
    /// is validated before anything else is built.
    pub fn new(config: EngineConfig, clients: Clients, shared: Resilience) -> Result<Self, GuideError> {
        config.validate()?;
        let gate = QualityGate::for_profile(&config.validation_profile)
            .map_err(|e| GuideError::configuration("validation_profile", e.to_string()))?;
        let registry = build_registry(&config, clients, &shared);
        let tasks = config.tasks();

        info!(
            providers = registry.len(),
            deadline_ms = config.deadline_ms,
            profile = %gate.profile().name,
            "guide engine ready"
        );

        Ok(Self {
            orchestrator: TaskOrchestrator::new(registry),
            tasks,
            weather_rules: WeatherRules::default(),
            gate,
            shared,
            store: Arc::new(InMemoryTripStore::new()),
            config,
        })
    }

    /// Production wiring: HTTP clients, in-memory cache with the configured
    /// TTL overrides, default breakers
    pub fn from_config(config: EngineConfig) -> Result<Self, GuideError> {
        config.validate()?;
        let cache = config
            .cache_ttl_secs
            .iter()
            .fold(CacheStore::in_memory(), |cache, (namespace, secs)| {
                cache.with_ttl(namespace.clone(), Duration::from_secs(*secs))
            });
        let shared = Resilience::new(Arc::new(cache), Arc::new(CircuitBreakerRegistry::default()));
        let clients = Clients::http(&config, &shared)
            .map_err(|e| GuideError::configuration("http_client", e.to_string()))?;
        Self::new(config, clients, shared)
    }

    pub fn with_store(mut self, store: Arc<dyn TripStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_weather_rules(mut self, rules: WeatherRules) -> Self {
        self.weather_rules = rules;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TripStore> {
        &self.store
    }

    pub fn breakers(&self) -> Vec<BreakerSnapshot> {
        self.shared.breakers.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.cache.stats()
    }

    pub async fn load_trip(&self, id: &str) -> Result<Option<TripState>, GuideError> {
        Ok(self.store.load_trip_state(id).await?)
    }

    pub async fn generate_guide(&self, request: GuideRequest) -> Result<Guide, GuideError> {
        self.generate(&request, &ProgressReporter::disabled()).await
    }

    /// Same as [`generate_guide`](Self::generate_guide), streaming progress.
    /// The channel always ends with exactly one `Completed` or `Failed` event.
    pub async fn generate_guide_with_progress(
        &self,
        request: GuideRequest,
        progress: ProgressSender,
    ) -> Result<Guide, GuideError> {
        let reporter = ProgressReporter::new(progress);
        let result = self.generate(&request, &reporter).await;
        match &result {
            Ok(guide) => reporter.complete(format!("guide ready (quality {})", guide.quality_score)),
            Err(err) => reporter.fail(err.to_string()),
        }
        result
    }

    async fn generate(
        &self,
        request: &GuideRequest,
        progress: &ProgressReporter,
    ) -> Result<Guide, GuideError> {
        let started_at = Utc::now();
        let mut ctx = GenerationContext::from_request(request)?;
        if let Some(trip_id) = &request.trip_id {
            ctx.request_id = trip_id.clone();
        }
        progress.report(
            5,
            ProgressStage::Context,
            format!("planning {} day(s) in {}", ctx.duration_days, ctx.destination),
        );

        let scored = persona::score(&ctx.preferences);
        ctx.assign_persona(scored.persona);
        debug!(
            request_id = %ctx.request_id,
            persona = scored.persona.label(),
            factors = scored.factors.len(),
            "persona classified"
        );
        progress.report(
            15,
            ProgressStage::Persona,
            format!("traveler profile: {}", scored.persona.label()),
        );

        let batch = self
            .orchestrator
            .run_all(&ctx, &self.tasks, self.config.deadline(), progress)
            .await;
        batch.ensure_critical(&self.tasks)?;

        progress.report(75, ProgressStage::Weather, "matching activities to the forecast");
        let itinerary = draft_itinerary(&ctx, &batch);
        let itinerary = self.weather_rules.correlate(&itinerary, forecasts(&batch));

        progress.report(85, ProgressStage::Assembling, "assembling guide");
        let draft = assemble(&ctx, &batch, scored.persona, itinerary, ValidationReport::pending());

        progress.report(92, ProgressStage::Validating, "checking guide quality");
        let outcome: GateOutcome = self.gate.run(draft);
        let failure = outcome.failure_report();
        let mut guide = finalize(outcome.guide, outcome.report);

        let finished_at = Utc::now();
        guide.timing.started_at = started_at;
        guide.timing.finished_at = finished_at;
        guide.timing.total_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        if !guide.validation.passed {
            warn!(
                request_id = %ctx.request_id,
                violations = guide.validation.violations.len(),
                repair_attempted = guide.validation.repair_attempted,
                "guide failed validation"
            );
            return Err(GuideError::ValidationFailure {
                partial_guide: Box::new(guide),
                violations: failure.violations,
                repair_attempted: failure.repair_attempted,
            });
        }

        if let Some(trip_id) = &request.trip_id {
            self.store
                .save_trip_state(trip_id, TripState::new(request.clone(), guide.clone()))
                .await?;
            debug!(trip_id = %trip_id, "trip state saved");
        }

        info!(
            request_id = %ctx.request_id,
            persona = guide.persona.label(),
            quality = guide.quality_score,
            total_ms = guide.timing.total_ms,
            "guide generated"
        );
        Ok(guide)
    }
}
