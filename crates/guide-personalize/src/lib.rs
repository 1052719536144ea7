//! Guide Personalize: who is travelling, and what the weather allows
//!
//! - [`persona`]: deterministic archetype classification plus the affinity
//!   profiles used to rank recommendations
//! - [`weather`]: ordered rule table correlating forecasts with activities

pub mod persona;
pub mod weather;

pub use persona::{classify, profile, score, Feature, PersonaProfile, PersonaScore, ScoreFactor};
pub use weather::{weather_summary, RuleTableError, WeatherRule, WeatherRules};

use guide_core::{DailyForecast, DayPlan};

/// Annotate one day against the built-in rule table
pub fn annotate(day: &DayPlan, forecast: &DailyForecast) -> DayPlan {
    WeatherRules::default().annotate(day, forecast)
}
