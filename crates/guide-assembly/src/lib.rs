//! Guide Assembly: provider results → ranked, scored `Guide`
//!
//! ```text
//! BatchOutcome ──draft_itinerary──▶ days ──(weather)──▶ assemble ──▶ quality gate ──▶ finalize
//! ```

pub mod assembler;
pub mod ranking;
pub mod score;

pub use assembler::{assemble, draft_itinerary, finalize, forecasts, limits, merge_recommendations};
pub use ranking::{event_affinity, neighborhood_affinity, rank_by, recommendation_affinity};
pub use score::{quality_score, score_breakdown, ScoreBreakdown};
