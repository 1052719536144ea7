//! Collaborator contracts for the external content sources
//!
//! Each trait is the narrowest thing an adapter needs. HTTP implementations
//! live in [`crate::http`]; tests plug in in-process fakes.
use crate::error::ClientError;
use async_trait::async_trait;
use chrono::NaiveDate;
use guide_core::{DailyForecast, EventRecord, PlaceRecord};

/// Search/LLM provider: free text in, free text out
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn query(&self, prompt: &str) -> Result<String, ClientError>;
}

#[async_trait]
pub trait WeatherClient: Send + Sync {
    async fn forecast(
        &self,
        location: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyForecast>, ClientError>;
}

/// Places/geocoding provider
#[async_trait]
pub trait PlacesClient: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<PlaceRecord>, ClientError>;
}

#[async_trait]
pub trait EventsClient: Send + Sync {
    async fn events(
        &self,
        location: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<EventRecord>, ClientError>;
}
