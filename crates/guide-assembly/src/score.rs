//! Guide quality score (0-100)

use guide_core::{Guide, ValidationReport};
use serde::Serialize;

/// Points per present section; sums to 70
const SECTION_POINTS: [(&str, u32); 9] = [
    ("summary", 10),
    ("insights", 5),
    ("itinerary", 15),
    ("restaurants", 10),
    ("attractions", 10),
    ("practical_info", 5),
    ("hidden_gems", 5),
    ("neighborhoods", 5),
    ("events", 5),
];

const MIN_COUNT_POINTS: u32 = 5;
const PERSONALIZATION_POINTS: u32 = 8;
const WEATHER_POINTS: u32 = 7;
const VIOLATION_PENALTY: u32 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub sections: u32,
    pub counts: u32,
    pub personalization: u32,
    pub weather: u32,
    pub penalty: u32,
    pub total: u32,
}

fn section_present(guide: &Guide, section: &str) -> bool {
    match section {
        "summary" => !guide.summary.trim().is_empty(),
        "insights" => !guide.destination_insights.trim().is_empty(),
        "itinerary" => !guide.itinerary.is_empty(),
        "restaurants" => !guide.restaurants.is_empty(),
        "attractions" => !guide.attractions.is_empty(),
        "practical_info" => !guide.practical_info.is_empty(),
        "hidden_gems" => !guide.hidden_gems.is_empty(),
        "neighborhoods" => !guide.neighborhoods.is_empty(),
        "events" => !guide.events.is_empty(),
        _ => false,
    }
}

pub fn score_breakdown(guide: &Guide, report: &ValidationReport) -> ScoreBreakdown {
    let sections = SECTION_POINTS
        .iter()
        .filter(|(name, _)| section_present(guide, name))
        .map(|(_, points)| points)
        .sum();

    let counts = [
        guide.restaurants.len() >= 3,
        guide.attractions.len() >= 3,
        guide.itinerary.len() == guide.duration_days as usize,
    ]
    .iter()
    .filter(|ok| **ok)
    .count() as u32
        * MIN_COUNT_POINTS;

    let personalization = if guide.personalized { PERSONALIZATION_POINTS } else { 0 };
    let weather = if guide.weather_annotated_days() > 0 { WEATHER_POINTS } else { 0 };
    let penalty = report.violations.len() as u32 * VIOLATION_PENALTY;

    let earned = sections + counts + personalization + weather;
    ScoreBreakdown {
        sections,
        counts,
        personalization,
        weather,
        penalty,
        total: earned.saturating_sub(penalty).min(100),
    }
}

pub fn quality_score(guide: &Guide, report: &ValidationReport) -> u32 {
    score_breakdown(guide, report).total
}
