//! Persona-affinity ranking
//!
//! Keyword hits count 2 each; an item at one of the persona's preferred
//! price levels gets 3, one level off gets 1. Sorting is stable, so equal
//! scores keep provider order.

use guide_core::{EventRecord, Neighborhood, PersonaTag, Recommendation};
use guide_personalize::{profile, PersonaProfile};
use std::cmp::Reverse;

const KEYWORD_POINTS: u32 = 2;
const PRICE_MATCH_POINTS: u32 = 3;
const PRICE_NEAR_POINTS: u32 = 1;

fn keyword_hits(profile: &PersonaProfile, haystack: &str) -> u32 {
    let haystack = haystack.to_lowercase();
    profile
        .affinity_keywords
        .iter()
        .filter(|k| haystack.contains(*k))
        .count() as u32
}

fn price_points(profile: &PersonaProfile, level: Option<u8>) -> u32 {
    let Some(level) = level else {
        return 0;
    };
    if profile.price_levels.contains(&level) {
        PRICE_MATCH_POINTS
    } else if profile
        .price_levels
        .iter()
        .any(|p| p.abs_diff(level) == 1)
    {
        PRICE_NEAR_POINTS
    } else {
        0
    }
}

pub fn recommendation_affinity(persona: PersonaTag, item: &Recommendation) -> u32 {
    let profile = profile(persona);
    let text = format!(
        "{} {} {} {}",
        item.name,
        item.description,
        item.category.as_deref().unwrap_or_default(),
        item.tags.join(" ")
    );
    keyword_hits(profile, &text) * KEYWORD_POINTS + price_points(profile, item.price_level)
}

pub fn event_affinity(persona: PersonaTag, event: &EventRecord) -> u32 {
    let text = format!(
        "{} {} {}",
        event.name,
        event.category.as_deref().unwrap_or_default(),
        event.description
    );
    keyword_hits(profile(persona), &text) * KEYWORD_POINTS
}

pub fn neighborhood_affinity(persona: PersonaTag, hood: &Neighborhood) -> u32 {
    let text = format!("{} {}", hood.description, hood.best_for.join(" "));
    keyword_hits(profile(persona), &text) * KEYWORD_POINTS
}

/// Stable sort by descending affinity, then truncate
pub fn rank_by<T, F>(mut items: Vec<T>, limit: usize, affinity: F) -> Vec<T>
where
    F: Fn(&T) -> u32,
{
    items.sort_by_key(|item| Reverse(affinity(item)));
    items.truncate(limit);
    items
}
