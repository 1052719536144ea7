//! Weather adapter: daily forecast for the trip dates
use crate::adapter::Guarded;
use crate::clients::WeatherClient;
use async_trait::async_trait;
use guide_core::{providers, ContentProvider, GenerationContext, ProviderPayload, ProviderResult};
use guide_resilience::namespaces;
use serde_json::json;
use std::sync::Arc;

pub struct WeatherAdapter {
    client: Arc<dyn WeatherClient>,
    guard: Guarded,
}

impl WeatherAdapter {
    pub fn new(client: Arc<dyn WeatherClient>, guard: Guarded) -> Self {
        Self { client, guard }
    }
}

#[async_trait]
impl ContentProvider for WeatherAdapter {
    fn name(&self) -> &str {
        providers::WEATHER
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
                namespaces::WEATHER,
                &params,
                |_| {
                    let client = Arc::clone(&self.client);
                    let location = ctx.destination.clone();
                    async move {
                        let mut days = client.forecast(&location, start, end).await?;
                        days.retain(|d| d.date >= start && d.date <= end);
                        days.sort_by_key(|d| d.date);
                        Ok(days)
                    }
                },
                ProviderPayload::Weather,
            )
            .await
    }
}
