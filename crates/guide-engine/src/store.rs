//! Trip persistence
//!
//! The engine only needs two operations: load a trip's last state and save
//! a new one. Anything key-value shaped can sit behind [`TripStore`].
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use guide_core::{GuideError, Guide, GuideRequest};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("could not encode trip '{id}': {message}")]
    Encoding { id: String, message: String },
}

impl From<StoreError> for GuideError {
    fn from(err: StoreError) -> Self {
        GuideError::Storage(err.to_string())
    }
}

/// Everything remembered about one trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripState {
    pub request: GuideRequest,
    pub guide: Guide,
    pub updated_at: DateTime<Utc>,
}

impl TripState {
    pub fn new(request: GuideRequest, guide: Guide) -> Self {
        Self {
            request,
            guide,
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait TripStore: Send + Sync {
    async fn load_trip_state(&self, id: &str) -> Result<Option<TripState>, StoreError>;
    async fn save_trip_state(&self, id: &str, state: TripState) -> Result<(), StoreError>;
}

/// Process-local store; the default when nothing else is configured
#[derive(Debug, Default)]
pub struct InMemoryTripStore {
    trips: DashMap<String, TripState>,
}

impl InMemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

#[async_trait]
impl TripStore for InMemoryTripStore {
    async fn load_trip_state(&self, id: &str) -> Result<Option<TripState>, StoreError> {
        Ok(self.trips.get(id).map(|entry| entry.value().clone()))
    }

    async fn save_trip_state(&self, id: &str, state: TripState) -> Result<(), StoreError> {
        self.trips.insert(id.to_string(), state);
        Ok(())
    }
}
