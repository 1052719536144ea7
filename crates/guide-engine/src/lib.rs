//! Guide Engine: the exposed `generate_guide` operation
//!
//! Wires the provider adapters, persona classification, weather correlation,
//! assembly and the quality gate into one call, with optional progress
//! streaming and trip persistence.

pub mod engine;
pub mod store;

pub use engine::GuideEngine;
pub use store::{InMemoryTripStore, StoreError, TripState, TripStore};
