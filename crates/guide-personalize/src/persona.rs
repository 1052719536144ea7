//! Persona classification
//!
//! Scores every archetype from the traveler's preferences and picks the
//! highest. Features are applied in a fixed order (budget, group, interests,
//! pace, adventurousness) and ties go to the archetype declared first in
//! `PersonaTag::ALL`, so the result depends only on the preferences.

use guide_core::{BudgetTier, GroupType, Pace, PersonaTag, TravelPreferences};
use serde::Serialize;
use std::collections::BTreeMap;

/// Which preference produced a factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Budget,
    Group,
    Interest,
    Pace,
    Adventurousness,
}

/// One contribution to one archetype's score
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreFactor {
    pub feature: Feature,
    pub persona: PersonaTag,
    pub points: u32,
    pub reason: String,
}

/// Full scoring breakdown, exposed for inspection and logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonaScore {
    pub persona: PersonaTag,
    pub scores: BTreeMap<PersonaTag, u32>,
    pub factors: Vec<ScoreFactor>,
}

impl PersonaScore {
    pub fn points(&self, persona: PersonaTag) -> u32 {
        self.scores.get(&persona).copied().unwrap_or(0)
    }
}

// ============================================================================
// Keyword table
// ============================================================================

/// Interest keywords. Multi-word entries come first; an interest counts
/// toward the first entry it contains and no other.
const INTEREST_TABLE: &[(&str, &[(PersonaTag, u32)])] = &[
    ("fine dining", &[(PersonaTag::LuxuryConnoisseur, 3), (PersonaTag::Foodie, 3)]),
    ("street food", &[(PersonaTag::Foodie, 3), (PersonaTag::BudgetBackpacker, 1)]),
    ("theme park", &[(PersonaTag::FamilyTraveler, 3)]),
    ("michelin", &[(PersonaTag::LuxuryConnoisseur, 3), (PersonaTag::Foodie, 3)]),
    ("luxury", &[(PersonaTag::LuxuryConnoisseur, 3)]),
    ("designer", &[(PersonaTag::LuxuryConnoisseur, 3)]),
    ("shopping", &[(PersonaTag::LuxuryConnoisseur, 1)]),
    ("museum", &[(PersonaTag::CulturalExplorer, 3)]),
    ("art", &[(PersonaTag::CulturalExplorer, 3)]),
    ("history", &[(PersonaTag::CulturalExplorer, 3)]),
    ("architecture", &[(PersonaTag::CulturalExplorer, 3)]),
    ("culture", &[(PersonaTag::CulturalExplorer, 3)]),
    ("theater", &[(PersonaTag::CulturalExplorer, 2)]),
    ("theatre", &[(PersonaTag::CulturalExplorer, 2)]),
    ("food", &[(PersonaTag::Foodie, 3)]),
    ("cuisine", &[(PersonaTag::Foodie, 3)]),
    ("wine", &[(PersonaTag::Foodie, 2), (PersonaTag::LuxuryConnoisseur, 1)]),
    ("cooking", &[(PersonaTag::Foodie, 3)]),
    ("market", &[(PersonaTag::Foodie, 2)]),
    ("hiking", &[(PersonaTag::AdventureSeeker, 3)]),
    ("adventure", &[(PersonaTag::AdventureSeeker, 3)]),
    ("climbing", &[(PersonaTag::AdventureSeeker, 3)]),
    ("diving", &[(PersonaTag::AdventureSeeker, 3)]),
    ("surf", &[(PersonaTag::AdventureSeeker, 3)]),
    ("kayak", &[(PersonaTag::AdventureSeeker, 3)]),
    ("ski", &[(PersonaTag::AdventureSeeker, 3)]),
    ("outdoor", &[(PersonaTag::AdventureSeeker, 2)]),
    ("kids", &[(PersonaTag::FamilyTraveler, 3)]),
    ("family", &[(PersonaTag::FamilyTraveler, 3)]),
    ("zoo", &[(PersonaTag::FamilyTraveler, 2)]),
    ("hostel", &[(PersonaTag::BudgetBackpacker, 3)]),
    ("backpack", &[(PersonaTag::BudgetBackpacker, 3)]),
    ("free", &[(PersonaTag::BudgetBackpacker, 2)]),
    ("nightlife", &[(PersonaTag::BudgetBackpacker, 1), (PersonaTag::AdventureSeeker, 1)]),
    ("spa", &[(PersonaTag::WellnessSeeker, 3)]),
    ("yoga", &[(PersonaTag::WellnessSeeker, 3)]),
    ("wellness", &[(PersonaTag::WellnessSeeker, 3)]),
    ("meditation", &[(PersonaTag::WellnessSeeker, 3)]),
    ("relax", &[(PersonaTag::WellnessSeeker, 2)]),
];

fn budget_points(budget: BudgetTier) -> &'static [(PersonaTag, u32)] {
    match budget {
        BudgetTier::Luxury => &[(PersonaTag::LuxuryConnoisseur, 5)],
        BudgetTier::Upscale => &[(PersonaTag::LuxuryConnoisseur, 3), (PersonaTag::Foodie, 1)],
        BudgetTier::Moderate => &[],
        BudgetTier::Budget => &[(PersonaTag::BudgetBackpacker, 5)],
    }
}

fn group_points(group: GroupType) -> &'static [(PersonaTag, u32)] {
    match group {
        GroupType::Family => &[(PersonaTag::FamilyTraveler, 5)],
        GroupType::Solo => &[(PersonaTag::BudgetBackpacker, 1), (PersonaTag::AdventureSeeker, 1)],
        GroupType::Couple => &[(PersonaTag::LuxuryConnoisseur, 1), (PersonaTag::WellnessSeeker, 1)],
        GroupType::Friends => &[(PersonaTag::AdventureSeeker, 1), (PersonaTag::Foodie, 1)],
        GroupType::Business => &[(PersonaTag::LuxuryConnoisseur, 1)],
    }
}

fn pace_points(pace: Pace) -> &'static [(PersonaTag, u32)] {
    match pace {
        Pace::Relaxed => &[(PersonaTag::WellnessSeeker, 2)],
        Pace::Moderate => &[],
        Pace::Packed => &[(PersonaTag::CulturalExplorer, 1), (PersonaTag::AdventureSeeker, 1)],
    }
}

fn adventurousness_points(level: u8) -> &'static [(PersonaTag, u32)] {
    match level {
        9..=u8::MAX => &[(PersonaTag::AdventureSeeker, 3)],
        7 | 8 => &[(PersonaTag::AdventureSeeker, 2)],
        0..=2 => &[(PersonaTag::WellnessSeeker, 1)],
        _ => &[],
    }
}

// ============================================================================
// Scoring
// ============================================================================

struct Tally {
    scores: BTreeMap<PersonaTag, u32>,
    factors: Vec<ScoreFactor>,
}

impl Tally {
    fn new() -> Self {
        Self {
            scores: PersonaTag::ALL.iter().map(|p| (*p, 0)).collect(),
            factors: Vec::new(),
        }
    }

    fn add(&mut self, feature: Feature, points: &[(PersonaTag, u32)], reason: &str) {
        for (persona, pts) in points {
            *self.scores.entry(*persona).or_insert(0) += pts;
            self.factors.push(ScoreFactor {
                feature,
                persona: *persona,
                points: *pts,
                reason: reason.to_string(),
            });
        }
    }
}

pub fn score(preferences: &TravelPreferences) -> PersonaScore {
    let mut tally = Tally::new();

    let budget = preferences.budget;
    tally.add(
        Feature::Budget,
        budget_points(budget),
        &format!("budget {}", budget.symbol()),
    );

    if let Some(group) = preferences.group_type {
        tally.add(Feature::Group, group_points(group), &format!("group {:?}", group));
    }

    for interest in &preferences.interests {
        if let Some((keyword, points)) = INTEREST_TABLE
            .iter()
            .find(|(keyword, _)| interest.contains(keyword))
        {
            tally.add(
                Feature::Interest,
                points,
                &format!("interest '{}' ~ {}", interest, keyword),
            );
        }
    }

    if let Some(pace) = preferences.pace {
        tally.add(Feature::Pace, pace_points(pace), &format!("pace {:?}", pace));
    }

    if let Some(level) = preferences.adventurousness {
        tally.add(
            Feature::Adventurousness,
            adventurousness_points(level),
            &format!("adventurousness {}", level),
        );
    }

    // First maximum in priority order
    let mut persona = PersonaTag::ALL[0];
    let mut best = 0;
    for candidate in PersonaTag::ALL {
        let points = tally.scores.get(&candidate).copied().unwrap_or(0);
        if points > best {
            best = points;
            persona = candidate;
        }
    }

    PersonaScore {
        persona,
        scores: tally.scores,
        factors: tally.factors,
    }
}

/// Classify preferences into one archetype
pub fn classify(preferences: &TravelPreferences) -> PersonaTag {
    score(preferences).persona
}

// ============================================================================
// Profiles
// ============================================================================

/// What an archetype gravitates toward, used to rank recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonaProfile {
    pub persona: PersonaTag,
    pub affinity_keywords: &'static [&'static str],
    /// Preferred price levels (1 = $, 4 = $$$$)
    pub price_levels: &'static [u8],
}

const PROFILES: [PersonaProfile; 7] = [
    PersonaProfile {
        persona: PersonaTag::CulturalExplorer,
        affinity_keywords: &["museum", "gallery", "history", "historic", "art", "cathedral", "architecture", "theater", "heritage"],
        price_levels: &[1, 2, 3],
    },
    PersonaProfile {
        persona: PersonaTag::LuxuryConnoisseur,
        affinity_keywords: &["fine dining", "michelin", "luxury", "tasting menu", "champagne", "boutique", "palace", "exclusive"],
        price_levels: &[3, 4],
    },
    PersonaProfile {
        persona: PersonaTag::AdventureSeeker,
        affinity_keywords: &["hike", "hiking", "climb", "kayak", "bike", "trail", "adventure", "outdoor", "viewpoint"],
        price_levels: &[1, 2],
    },
    PersonaProfile {
        persona: PersonaTag::Foodie,
        affinity_keywords: &["food", "market", "bistro", "wine", "bakery", "tasting", "cuisine", "chef", "restaurant"],
        price_levels: &[2, 3, 4],
    },
    PersonaProfile {
        persona: PersonaTag::FamilyTraveler,
        affinity_keywords: &["family", "kids", "children", "park", "zoo", "aquarium", "playground", "interactive"],
        price_levels: &[1, 2],
    },
    PersonaProfile {
        persona: PersonaTag::BudgetBackpacker,
        affinity_keywords: &["free", "cheap", "street food", "hostel", "local", "market", "walking"],
        price_levels: &[1],
    },
    PersonaProfile {
        persona: PersonaTag::WellnessSeeker,
        affinity_keywords: &["spa", "yoga", "garden", "wellness", "thermal", "retreat", "quiet", "organic"],
        price_levels: &[2, 3],
    },
];

pub fn profile(persona: PersonaTag) -> &'static PersonaProfile {
    &PROFILES[persona.index()]
}
