//! Guide assembly
//!
//! Pure functions from provider results to a `Guide`. Nothing here does
//! I/O or can fail: a missing or failed provider just leaves its sections
//! empty, and validation decides whether that is acceptable.

use crate::ranking::{event_affinity, neighborhood_affinity, rank_by, recommendation_affinity};
use crate::score::quality_score;
use guide_core::{
    normalize_name, providers, BatchOutcome, DailyForecast, DayPlan, EventRecord, GenerationContext,
    Guide, PersonaTag, PlaceCategory, PlaceRecord, ProviderPayload, ProviderTiming,
    Recommendation, SearchContent, ValidationReport,
};
use guide_personalize::weather_summary;
use std::collections::HashMap;
use tracing::debug;

/// Section caps after ranking
pub mod limits {
    pub const RESTAURANTS: usize = 10;
    pub const ATTRACTIONS: usize = 10;
    pub const EVENTS: usize = 8;
    pub const HIDDEN_GEMS: usize = 6;
    pub const NEIGHBORHOODS: usize = 5;
}

fn search_content(results: &BatchOutcome) -> Option<&SearchContent> {
    match results.result(providers::SEARCH)?.payload()? {
        ProviderPayload::Search(content) => Some(content),
        _ => None,
    }
}

pub fn forecasts(results: &BatchOutcome) -> &[DailyForecast] {
    match results.result(providers::WEATHER).and_then(|r| r.payload()) {
        Some(ProviderPayload::Weather(days)) => days,
        _ => &[],
    }
}

fn places(results: &BatchOutcome) -> &[PlaceRecord] {
    match results.result(providers::PLACES).and_then(|r| r.payload()) {
        Some(ProviderPayload::Places(places)) => places,
        _ => &[],
    }
}

fn events(results: &BatchOutcome) -> &[EventRecord] {
    match results.result(providers::EVENTS).and_then(|r| r.payload()) {
        Some(ProviderPayload::Events(events)) => events,
        _ => &[],
    }
}

/// Exactly `duration_days` days dated from the start date. Search days are
/// matched by their day number, or by position when unnumbered; days the
/// search omitted stay empty.
pub fn draft_itinerary(ctx: &GenerationContext, results: &BatchOutcome) -> Vec<DayPlan> {
    let mut by_day = HashMap::new();
    if let Some(content) = search_content(results) {
        for (i, day) in content.itinerary.iter().enumerate() {
            let n = if day.day == 0 { i as u32 + 1 } else { day.day };
            by_day.entry(n).or_insert(day);
        }
    }

    ctx.dates()
        .zip(1u32..)
        .map(|(date, n)| {
            let mut plan = DayPlan::empty(n, date);
            if let Some(day) = by_day.get(&n) {
                if !day.title.trim().is_empty() {
                    plan.title = day.title.clone();
                }
                plan.morning = clean(&day.morning);
                plan.afternoon = clean(&day.afternoon);
                plan.evening = clean(&day.evening);
            }
            plan
        })
        .collect()
}

fn clean(activities: &[String]) -> Vec<String> {
    activities
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}

fn from_place(place: &PlaceRecord) -> Recommendation {
    Recommendation {
        name: place.name.clone(),
        description: String::new(),
        category: place.types.first().cloned(),
        address: place.address.clone(),
        rating: place.rating,
        price_level: place.price_level,
        tags: place.types.clone(),
    }
}

/// Search recommendations first, enriched by matching places; unmatched
/// places appended. De-duplicated by normalized name.
pub fn merge_recommendations(
    search: &[Recommendation],
    places: &[PlaceRecord],
    category: PlaceCategory,
) -> Vec<Recommendation> {
    let mut merged: Vec<Recommendation> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for rec in search {
        let key = normalize_name(&rec.name);
        if key.is_empty() || index.contains_key(&key) {
            continue;
        }
        index.insert(key, merged.len());
        merged.push(rec.clone());
    }

    for place in places.iter().filter(|p| p.category == category) {
        let key = normalize_name(&place.name);
        if key.is_empty() {
            continue;
        }
        match index.get(&key) {
            Some(&i) => {
                let rec = &mut merged[i];
                rec.rating = rec.rating.or(place.rating);
                rec.address = rec.address.take().or_else(|| place.address.clone());
                rec.price_level = rec.price_level.or(place.price_level);
            }
            None => {
                index.insert(key, merged.len());
                merged.push(from_place(place));
            }
        }
    }
    merged
}

/// Merge, rank and cap every section into a guide carrying `report`
pub fn assemble(
    ctx: &GenerationContext,
    results: &BatchOutcome,
    persona: PersonaTag,
    itinerary: Vec<DayPlan>,
    report: ValidationReport,
) -> Guide {
    let mut guide = Guide::new(
        ctx.request_id.clone(),
        ctx.destination.clone(),
        ctx.start_date,
        ctx.end_date,
        persona,
    );
    guide.duration_days = ctx.duration_days;
    guide.accommodation = ctx.accommodation.clone();
    guide.itinerary = itinerary;

    let empty = SearchContent::default();
    let content = search_content(results).unwrap_or(&empty);
    guide.summary = content.summary.trim().to_string();
    guide.destination_insights = content.destination_insights.trim().to_string();
    guide.practical_info = content.practical_info.clone();

    let places = places(results);
    let restaurants = merge_recommendations(&content.restaurants, places, PlaceCategory::Restaurant);
    let attractions = merge_recommendations(&content.attractions, places, PlaceCategory::Attraction);
    let gems = merge_recommendations(&content.hidden_gems, &[], PlaceCategory::Other);

    let affinity = |r: &Recommendation| recommendation_affinity(persona, r);
    guide.restaurants = rank_by(restaurants, limits::RESTAURANTS, affinity);
    guide.attractions = rank_by(attractions, limits::ATTRACTIONS, affinity);
    guide.hidden_gems = rank_by(gems, limits::HIDDEN_GEMS, affinity);
    guide.events = rank_by(events(results).to_vec(), limits::EVENTS, |e| event_affinity(persona, e));
    guide.neighborhoods = rank_by(content.neighborhoods.clone(), limits::NEIGHBORHOODS, |n| {
        neighborhood_affinity(persona, n)
    });
    guide.personalized = true;

    guide.weather_summary = weather_summary(forecasts(results));
    guide.timing.providers = results
        .records
        .iter()
        .map(|(name, record)| {
            (
                name.clone(),
                ProviderTiming {
                    outcome: record.result.outcome_label(),
                    latency_ms: record.latency.as_millis() as u64,
                },
            )
        })
        .collect();
    guide.validation = report;

    debug!(
        guide = %guide.id,
        restaurants = guide.restaurants.len(),
        attractions = guide.attractions.len(),
        events = guide.events.len(),
        "assembled guide"
    );
    guide
}

/// Attach the final report and compute the quality score
pub fn finalize(mut guide: Guide, report: ValidationReport) -> Guide {
    guide.quality_score = quality_score(&guide, &report);
    guide.validation = report;
    guide
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use guide_core::{
        FailureKind, Neighborhood, PracticalInfo, ProviderResult, SearchDay, TaskRecord,
        TravelPreferences,
    };
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn ctx() -> GenerationContext {
        GenerationContext::new(
            "Paris",
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            Some("Hôtel Lutetia".into()),
            TravelPreferences::default(),
        )
        .unwrap()
    }

    fn outcome(results: Vec<(&str, ProviderResult)>) -> BatchOutcome {
        let records: BTreeMap<String, TaskRecord> = results
            .into_iter()
            .map(|(name, result)| {
                (
                    name.to_string(),
                    TaskRecord {
                        result,
                        latency: Duration::from_millis(120),
                    },
                )
            })
            .collect();
        BatchOutcome {
            records,
            elapsed: Duration::from_millis(150),
            deadline_hit: false,
        }
    }

    fn place(name: &str, category: PlaceCategory, rating: f32) -> PlaceRecord {
        PlaceRecord {
            name: name.into(),
            address: Some(format!("{} address", name)),
            rating: Some(rating),
            price_level: Some(4),
            category,
            types: vec!["restaurant".into()],
        }
    }

    fn search() -> SearchContent {
        SearchContent {
            summary: " Paris in June. ".into(),
            itinerary: vec![
                SearchDay {
                    day: 2,
                    title: "Left Bank".into(),
                    morning: vec!["Musée d'Orsay".into(), "  ".into()],
                    ..SearchDay::default()
                },
                SearchDay {
                    day: 7,
                    title: "Beyond the trip".into(),
                    ..SearchDay::default()
                },
            ],
            restaurants: vec![
                Recommendation::new("Chez Janou").with_price_level(2),
                Recommendation::new("Le Jules Verne").with_description("Michelin-starred fine dining"),
                Recommendation::new("le jules-verne"),
            ],
            neighborhoods: vec![Neighborhood {
                name: "Le Marais".into(),
                description: "Boutique shopping".into(),
                best_for: vec![],
            }],
            ..SearchContent::default()
        }
    }

    #[test]
    fn test_itinerary_has_every_trip_day() {
        let results = outcome(vec![(
            providers::SEARCH,
            ProviderResult::success(ProviderPayload::Search(search())),
        )]);
        let days = draft_itinerary(&ctx(), &results);

        assert_eq!(days.len(), 3);
        assert_eq!(days[0].activity_count(), 0);
        assert_eq!(days[1].title, "Left Bank");
        assert_eq!(days[1].morning, vec!["Musée d'Orsay".to_string()]);
        assert_eq!(days[2].date, NaiveDate::from_ymd_opt(2025, 6, 3).unwrap());
    }

    #[test]
    fn test_failed_providers_leave_sections_empty() {
        let results = outcome(vec![
            (providers::SEARCH, ProviderResult::failure(FailureKind::Network, "reset")),
            (providers::EVENTS, ProviderResult::Timeout),
        ]);
        let c = ctx();
        let guide = assemble(&c, &results, PersonaTag::Foodie, draft_itinerary(&c, &results), ValidationReport::pending());

        assert!(guide.summary.is_empty());
        assert!(guide.restaurants.is_empty());
        assert!(guide.events.is_empty());
        assert_eq!(guide.itinerary.len(), 3);
        assert_eq!(guide.accommodation.as_deref(), Some("Hôtel Lutetia"));
        assert_eq!(guide.timing.providers["events"].outcome, "timeout");
        assert_eq!(guide.timing.providers["search"].outcome, "failure:network");
    }

    #[test]
    fn test_merge_dedupes_and_enriches() {
        let results = outcome(vec![
            (providers::SEARCH, ProviderResult::success(ProviderPayload::Search(search()))),
            (
                providers::PLACES,
                ProviderResult::success(ProviderPayload::Places(vec![
                    place("LE JULES VERNE", PlaceCategory::Restaurant, 4.4),
                    place("Le Cinq", PlaceCategory::Restaurant, 4.8),
                    place("Louvre", PlaceCategory::Attraction, 4.7),
                ])),
            ),
        ]);
        let c = ctx();
        let guide = assemble(
            &c,
            &results,
            PersonaTag::LuxuryConnoisseur,
            draft_itinerary(&c, &results),
            ValidationReport::pending(),
        );

        let names: Vec<_> = guide.restaurants.iter().map(|r| r.name.as_str()).collect();
        // Luxury ranking: keyword + price match first, then $$$$ place, then the $$ bistro
        assert_eq!(names, ["Le Jules Verne", "Le Cinq", "Chez Janou"]);
        assert_eq!(guide.restaurants[0].rating, Some(4.4));
        assert_eq!(guide.restaurants[0].price_level, Some(4));
        assert_eq!(guide.attractions[0].name, "Louvre");
        assert_eq!(guide.summary, "Paris in June.");
        assert!(guide.personalized);
    }

    #[test]
    fn test_lists_are_capped() {
        let many: Vec<PlaceRecord> = (0..25)
            .map(|i| place(&format!("Bistro number {}", i), PlaceCategory::Restaurant, 4.0))
            .collect();
        let results = outcome(vec![(providers::PLACES, ProviderResult::success(ProviderPayload::Places(many)))]);
        let c = ctx();
        let guide = assemble(&c, &results, PersonaTag::Foodie, Vec::new(), ValidationReport::pending());
        assert_eq!(guide.restaurants.len(), limits::RESTAURANTS);
    }

    #[test]
    fn test_finalize_scores_full_guide() {
        let c = ctx();
        let mut guide = Guide::new("g", "Paris", c.start_date, c.end_date, PersonaTag::Foodie);
        guide.summary = "x".repeat(60);
        guide.destination_insights = "y".repeat(40);
        guide.itinerary = c.dates().zip(1..).map(|(d, n)| DayPlan::empty(n, d)).collect();
        guide.itinerary[0].weather = Some(guide_core::WeatherAnnotation {
            rule: "pleasant".into(),
            high_f: 75.0,
            low_f: 60.0,
            conditions: vec![],
            clothing: vec![],
            recommended: vec![],
            note: String::new(),
            adjustments: vec![],
        });
        guide.restaurants = (0..3).map(|i| Recommendation::new(format!("R{}", i))).collect();
        guide.attractions = (0..3).map(|i| Recommendation::new(format!("A{}", i))).collect();
        guide.hidden_gems = vec![Recommendation::new("Gem")];
        guide.neighborhoods = vec![Neighborhood { name: "Marais".into(), description: String::new(), best_for: vec![] }];
        guide.events = vec![EventRecord {
            name: "Concert".into(),
            date: None,
            venue: None,
            category: None,
            url: None,
            description: String::new(),
        }];
        guide.practical_info = PracticalInfo {
            currency: Some("EUR".into()),
            ..PracticalInfo::default()
        };
        guide.personalized = true;

        let clean = finalize(guide.clone(), ValidationReport::pending());
        assert_eq!(clean.quality_score, 100);

        let mut report = ValidationReport::pending();
        report.violations = vec![
            guide_core::Violation {
                rule: guide_core::ValidationRule::MinTextLength,
                section: "summary".into(),
                message: "short".into(),
                expected: Some(50),
                actual: Some(10),
                fixable: true,
            };
            3
        ];
        guide.personalized = false;
        let penalized = finalize(guide, report);
        assert_eq!(penalized.quality_score, 100 - 8 - 15);
        assert_eq!(penalized.validation.violations.len(), 3);
    }
}
