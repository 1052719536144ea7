//! Guide validation
//!
//! Four rules, each a separate check over the draft. A draft passes only
//! with zero violations.

use crate::profile::ValidationProfile;
use guide_core::{Guide, Recommendation, ValidationReport, ValidationRule, Violation};
use std::collections::BTreeMap;
use tracing::debug;

pub struct Validator {
    profile: ValidationProfile,
}

fn chars(text: &str) -> usize {
    text.trim().chars().count()
}

impl Validator {
    pub fn new(profile: ValidationProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ValidationProfile {
        &self.profile
    }

    pub fn validate(&self, draft: &Guide) -> ValidationReport {
        let mut violations = Vec::new();
        violations.extend(self.check_required_sections(draft));
        violations.extend(self.check_text_lengths(draft));
        violations.extend(self.check_item_counts(draft));
        violations.extend(self.check_completeness(draft));

        let passed = violations.is_empty();
        debug!(
            guide = %draft.id,
            profile = %self.profile.name,
            violations = violations.len(),
            passed,
            "validated draft"
        );
        ValidationReport {
            violations,
            section_counts: section_counts(draft),
            passed,
            repair_attempted: false,
        }
    }

    // === required_section ===

    pub fn check_required_sections(&self, draft: &Guide) -> Vec<Violation> {
        let present = |section: &str| match section {
            "summary" => !draft.summary.trim().is_empty(),
            "insights" | "destination_insights" => !draft.destination_insights.trim().is_empty(),
            "itinerary" => !draft.itinerary.is_empty(),
            "restaurants" => !draft.restaurants.is_empty(),
            "attractions" => !draft.attractions.is_empty(),
            "events" => !draft.events.is_empty(),
            "hidden_gems" => !draft.hidden_gems.is_empty(),
            "neighborhoods" => !draft.neighborhoods.is_empty(),
            "practical_info" => !draft.practical_info.is_empty(),
            _ => true,
        };
        self.profile
            .required_sections
            .iter()
            .filter(|s| !present(s))
            .map(|section| Violation {
                rule: ValidationRule::RequiredSection,
                section: section.clone(),
                message: format!("required section '{}' is missing", section),
                expected: None,
                actual: None,
                fixable: matches!(section.as_str(), "summary" | "insights" | "destination_insights" | "itinerary"),
            })
            .collect()
    }

    // === min_text_length ===

    pub fn check_text_lengths(&self, draft: &Guide) -> Vec<Violation> {
        let mut out = Vec::new();
        let mut check = |section: &str, text: &str, min: usize| {
            let len = chars(text);
            // Absence is required_section's concern
            if len > 0 && len < min {
                out.push(Violation {
                    rule: ValidationRule::MinTextLength,
                    section: section.to_string(),
                    message: format!("{} has {} characters, needs at least {}", section, len, min),
                    expected: Some(min),
                    actual: Some(len),
                    fixable: true,
                });
            }
        };
        check("summary", &draft.summary, self.profile.min_summary_chars);
        check("insights", &draft.destination_insights, self.profile.min_insights_chars);
        out
    }

    // === min_item_count ===

    pub fn check_item_counts(&self, draft: &Guide) -> Vec<Violation> {
        [
            ("restaurants", draft.restaurants.len(), self.profile.min_restaurants, false),
            ("attractions", draft.attractions.len(), self.profile.min_attractions, false),
            ("itinerary", draft.itinerary.len(), self.profile.min_itinerary_days, true),
        ]
        .into_iter()
        .filter(|(_, count, min, _)| count < min)
        .map(|(section, count, min, fixable)| Violation {
            rule: ValidationRule::MinItemCount,
            section: section.to_string(),
            message: format!("{} has {} items, needs at least {}", section, count, min),
            expected: Some(min),
            actual: Some(count),
            fixable,
        })
        .collect()
    }

    // === item_completeness ===

    pub fn is_incomplete(&self, item: &Recommendation) -> bool {
        chars(&item.name) < self.profile.min_name_chars
    }

    pub fn check_completeness(&self, draft: &Guide) -> Vec<Violation> {
        let lists: [(&str, &[Recommendation]); 3] = [
            ("restaurants", &draft.restaurants),
            ("attractions", &draft.attractions),
            ("hidden_gems", &draft.hidden_gems),
        ];
        let mut tallies: Vec<(&str, usize, usize)> = lists
            .iter()
            .map(|(section, items)| {
                let incomplete = items.iter().filter(|i| self.is_incomplete(i)).count();
                (*section, incomplete, items.len())
            })
            .collect();
        tallies.push((
            "itinerary",
            draft.itinerary.iter().filter(|d| d.activity_count() == 0).count(),
            draft.itinerary.len(),
        ));

        tallies
            .into_iter()
            .filter(|(_, incomplete, total)| {
                *total > 0 && (*incomplete as f32) > self.profile.max_incomplete_ratio * (*total as f32)
            })
            .map(|(section, incomplete, total)| Violation {
                rule: ValidationRule::ItemCompleteness,
                section: section.to_string(),
                message: format!("{} of {} {} entries are incomplete", incomplete, total, section),
                expected: None,
                actual: Some(incomplete),
                fixable: true,
            })
            .collect()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationProfile::standard())
    }
}

fn section_counts(draft: &Guide) -> BTreeMap<String, usize> {
    [
        ("itinerary", draft.itinerary.len()),
        ("restaurants", draft.restaurants.len()),
        ("attractions", draft.attractions.len()),
        ("events", draft.events.len()),
        ("hidden_gems", draft.hidden_gems.len()),
        ("neighborhoods", draft.neighborhoods.len()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Validate against the standard profile
pub fn validate(draft: &Guide) -> ValidationReport {
    Validator::default().validate(draft)
}
