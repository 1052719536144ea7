//! Auto-repair
//!
//! Substitutes labeled placeholders built only from request facts
//! (destination, dates, duration, accommodation) and drops incomplete list
//! items. Restaurants, attractions and events are never invented.

use crate::profile::ValidationProfile;
use chrono::Duration;
use guide_core::{DayPlan, Guide, ValidationReport, ValidationRule, Violation};
use tracing::info;

/// Prefix on every generated placeholder
pub const PLACEHOLDER_MARK: &str = "[Placeholder]";

pub fn is_placeholder(text: &str) -> bool {
    text.trim_start().starts_with(PLACEHOLDER_MARK)
}

pub fn placeholder_summary(guide: &Guide) -> String {
    format!(
        "{} A {}-day trip to {} from {} to {}. Detailed recommendations for this trip \
         were not available when this guide was generated.",
        PLACEHOLDER_MARK, guide.duration_days, guide.destination, guide.start_date, guide.end_date
    )
}

pub fn placeholder_insights(guide: &Guide) -> String {
    format!(
        "{} Destination insights for {} were not available for {} to {}.",
        PLACEHOLDER_MARK, guide.destination, guide.start_date, guide.end_date
    )
}

/// Fill an empty day with generic, clearly labeled slots
pub fn fill_placeholder_day(day: &mut DayPlan, guide: &Guide) {
    let base = guide
        .accommodation
        .clone()
        .unwrap_or_else(|| "your accommodation".to_string());
    day.title = format!("Day {}: Open day in {}", day.day_number, guide.destination);
    day.morning = vec![format!("{} Explore {} at your own pace", PLACEHOLDER_MARK, guide.destination)];
    day.afternoon = vec![format!("{} Free afternoon near {}", PLACEHOLDER_MARK, base)];
    day.evening = vec![format!("{} Dinner close to {}", PLACEHOLDER_MARK, base)];
}

fn fixes(report: &ValidationReport) -> Vec<(ValidationRule, String)> {
    let mut out: Vec<(ValidationRule, String)> = Vec::new();
    for Violation { rule, section, fixable, .. } in &report.violations {
        let fix = (*rule, section.clone());
        if *fixable && !out.contains(&fix) {
            out.push(fix);
        }
    }
    out
}

/// Repaired copy of `draft`, or `None` when no violation is fixable
pub fn repair_with(
    profile: &ValidationProfile,
    draft: &Guide,
    report: &ValidationReport,
) -> Option<Guide> {
    let fixes = fixes(report);
    if fixes.is_empty() {
        return None;
    }

    let mut guide = draft.clone();
    let mut applied = Vec::new();
    for (rule, section) in &fixes {
        match (rule, section.as_str()) {
            (_, "summary") => {
                guide.summary = placeholder_summary(&guide);
                applied.push("summary");
            }
            (_, "insights") | (_, "destination_insights") => {
                guide.destination_insights = placeholder_insights(&guide);
                applied.push("insights");
            }
            (_, "itinerary") => {
                rebuild_itinerary(&mut guide);
                applied.push("itinerary");
            }
            (ValidationRule::ItemCompleteness, list) => {
                let min = profile.min_name_chars;
                let keep = |name: &str| name.trim().chars().count() >= min;
                match list {
                    "restaurants" => guide.restaurants.retain(|r| keep(&r.name)),
                    "attractions" => guide.attractions.retain(|r| keep(&r.name)),
                    "hidden_gems" => guide.hidden_gems.retain(|r| keep(&r.name)),
                    _ => continue,
                }
                applied.push("incomplete items");
            }
            _ => {}
        }
    }

    info!(guide = %guide.id, fixes = ?applied, "auto-repair applied");
    Some(guide)
}

/// Repair against the standard profile
pub fn repair(draft: &Guide, report: &ValidationReport) -> Option<Guide> {
    repair_with(&ValidationProfile::standard(), draft, report)
}

/// Exactly one day per trip date; empty days get placeholders
fn rebuild_itinerary(guide: &mut Guide) {
    let mut days = Vec::with_capacity(guide.duration_days as usize);
    for n in 1..=guide.duration_days {
        let existing = guide.itinerary.iter().find(|d| d.day_number == n).cloned();
        let date = guide.start_date + Duration::days(i64::from(n - 1));
        let mut day = existing.unwrap_or_else(|| DayPlan::empty(n, date));
        if day.activity_count() == 0 {
            fill_placeholder_day(&mut day, guide);
        }
        days.push(day);
    }
    guide.itinerary = days;
}
