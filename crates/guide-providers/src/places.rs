//! Places adapter: restaurants and attractions from two text queries
use crate::adapter::Guarded;
use crate::clients::PlacesClient;
use async_trait::async_trait;
use guide_core::{
    normalize_name, providers, BudgetTier, ContentProvider, GenerationContext, PlaceCategory,
    PlaceRecord, ProviderPayload, ProviderResult,
};
use guide_resilience::namespaces;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

pub struct PlacesAdapter {
    client: Arc<dyn PlacesClient>,
    guard: Guarded,
}

impl PlacesAdapter {
    pub fn new(client: Arc<dyn PlacesClient>, guard: Guarded) -> Self {
        Self { client, guard }
    }
}

/// Restaurant query, phrased for the budget tier
pub fn restaurant_query(destination: &str, budget: BudgetTier) -> String {
    let adjective = match budget {
        BudgetTier::Budget => "cheap",
        BudgetTier::Moderate => "best",
        BudgetTier::Upscale => "upscale",
        BudgetTier::Luxury => "fine dining",
    };
    format!("{} restaurants in {}", adjective, destination)
}

pub fn attraction_query(destination: &str) -> String {
    format!("top attractions in {}", destination)
}

/// Records with an unrecognized category take the category of the query
/// that found them; first occurrence of a name wins
fn merge(restaurants: Vec<PlaceRecord>, attractions: Vec<PlaceRecord>) -> Vec<PlaceRecord> {
    let tagged = restaurants
        .into_iter()
        .map(|p| (p, PlaceCategory::Restaurant))
        .chain(attractions.into_iter().map(|p| (p, PlaceCategory::Attraction)));

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (mut place, fallback) in tagged {
        if !seen.insert(normalize_name(&place.name)) {
            continue;
        }
        if place.category == PlaceCategory::Other {
            place.category = fallback;
        }
        out.push(place);
    }
    out
}

#[async_trait]
impl ContentProvider for PlacesAdapter {
    fn name(&self) -> &str {
        providers::PLACES
    }

    async fn fetch(&self, ctx: &GenerationContext) -> ProviderResult {
        let restaurants_q = restaurant_query(&ctx.destination, ctx.preferences.budget);
        let attractions_q = attraction_query(&ctx.destination);
        let params = json!({
            "restaurants": restaurants_q,
            "attractions": attractions_q,
        });
        self.guard
            .execute(
                namespaces::PLACES,
                &params,
                |_| {
                    let client = Arc::clone(&self.client);
                    let (rq, aq) = (restaurants_q.clone(), attractions_q.clone());
                    async move {
                        let (restaurants, attractions) =
                            futures::try_join!(client.search(&rq), client.search(&aq))?;
                        Ok(merge(restaurants, attractions))
                    }
                },
                ProviderPayload::Places,
            )
            .await
    }
}
