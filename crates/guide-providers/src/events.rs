//! Events adapter: dated happenings during the stay
use crate::adapter::Guarded;
use crate::clients::EventsClient;
use async_trait::async_trait;
use guide_core::{
    normalize_name, providers, ContentProvider, GenerationContext, ProviderPayload, ProviderResult,
};
use guide_resilience::namespaces;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

pub struct EventsAdapter {
    client: Arc<dyn EventsClient>,
    guard: Guarded,
}

impl EventsAdapter {
    pub fn new(client: Arc<dyn EventsClient>, guard: Guarded) -> Self {
        Self { client, guard }
    }
}

#[async_trait]
impl ContentProvider for EventsAdapter {
    fn name(&self) -> &str {
        providers::EVENTS
    }

    async fn fetch(&self, ctx: &GenerationContext) -> ProviderResult {
        let params = json!({
            "destination": ctx.destination,
            "start": ctx.start_date,
            "end": ctx.end_date,
        });
        let (start, end) = (ctx.start_date, ctx.end_date);
        self.guard
            .execute(
                namespaces::EVENTS,
                &params,
                |_| {
                    let client = Arc::clone(&self.client);
                    let location = ctx.destination.clone();
                    async move {
                        let mut events = client.events(&location, start, end).await?;
                        // Recurring shows come back once per performance
                        let mut seen = HashSet::new();
                        events.retain(|e| {
                            let in_range = e.date.map_or(true, |d| d >= start && d <= end);
                            in_range && seen.insert(normalize_name(&e.name))
                        });
                        Ok(events)
                    }
                },
                ProviderPayload::Events,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Resilience;
    use crate::error::ClientError;
    use chrono::NaiveDate;
    use guide_core::{EventRecord, TravelPreferences};

    struct Listing(Vec<EventRecord>);

    #[async_trait]
    impl EventsClient for Listing {
        async fn events(
            &self,
            _location: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<EventRecord>, ClientError> {
            Ok(self.0.clone())
        }
    }

    fn event(name: &str, date: Option<NaiveDate>) -> EventRecord {
        EventRecord {
            name: name.into(),
            date,
            venue: None,
            category: None,
            url: None,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_repeats_and_out_of_range_dropped() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day);
        let ctx = GenerationContext::new("Paris", d(1).unwrap(), d(3).unwrap(), None, TravelPreferences::default())
            .unwrap();
        let adapter = EventsAdapter::new(
            Arc::new(Listing(vec![
                event("Le Lac des Cygnes", d(1)),
                event("Le Lac des Cygnes", d(2)),
                event("Jazz à la Villette", d(3)),
                event("Rock en Seine", d(25)),
                event("Open-air cinema", None),
            ])),
            Guarded::new(providers::EVENTS, Resilience::fresh()),
        );

        match adapter.fetch(&ctx).await {
            ProviderResult::Success { payload: ProviderPayload::Events(events) } => {
                let names: Vec<_> = events.iter().map(|e| e.name.as_str()).collect();
                assert_eq!(names, ["Le Lac des Cygnes", "Jazz à la Villette", "Open-air cinema"]);
            }
            other => panic!("unexpected result: {}", other),
        }
    }
}
