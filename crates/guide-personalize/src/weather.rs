//! Weather-activity correlation
//!
//! An ordered rule table maps a day's forecast to clothing, a note, and
//! recommended and disallowed activities. Selection for a forecast:
//!
//! 1. first rule whose range holds the high and whose keywords meet the conditions
//! 2. else first rule whose range holds the high
//! 3. else no annotation
//!
//! Disallowed activities are rewritten to an indoor alternative when the
//! label says "outdoor", and dropped otherwise.

use guide_core::{DailyForecast, DayPlan, WeatherAnnotation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RuleTableError {
    #[error("WEATHER/RULES: {0}")]
    Parse(String),
    #[error("WEATHER/RULES: rule '{0}' has min_f above max_f")]
    InvertedRange(String),
}

/// Intensity words stripped from a disallowed tag before matching. Location
/// words such as "outdoor" stay, so "outdoor dining" never matches "Fine dining"
const QUALIFIERS: &[&str] = &["intensive", "strenuous", "long", "extended"];

const ALTERNATIVE_SUFFIX: &str = " (weather alternative)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRule {
    pub id: String,
    /// Inclusive °F range for the day's high
    pub min_f: f64,
    pub max_f: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub recommended: Vec<String>,
    #[serde(default)]
    pub disallowed: Vec<String>,
    #[serde(default)]
    pub clothing: Vec<String>,
    #[serde(default)]
    pub note: String,
}

impl WeatherRule {
    pub fn new(id: impl Into<String>, min_f: f64, max_f: f64) -> Self {
        Self {
            id: id.into(),
            min_f,
            max_f,
            keywords: Vec::new(),
            recommended: Vec::new(),
            disallowed: Vec::new(),
            clothing: Vec::new(),
            note: String::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_recommended(mut self, activities: &[&str]) -> Self {
        self.recommended = activities.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_disallowed(mut self, activities: &[&str]) -> Self {
        self.disallowed = activities.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_clothing(mut self, clothing: &[&str]) -> Self {
        self.clothing = clothing.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn contains(&self, high_f: f64) -> bool {
        high_f >= self.min_f && high_f <= self.max_f
    }

    pub fn matches_conditions(&self, conditions: &[String]) -> bool {
        self.keywords.iter().any(|k| {
            let k = k.to_lowercase();
            conditions.iter().any(|c| c.to_lowercase().contains(&k))
        })
    }
}

/// Ordered rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRules {
    pub rules: Vec<WeatherRule>,
}

impl WeatherRules {
    pub fn new(rules: Vec<WeatherRule>) -> Result<Self, RuleTableError> {
        if let Some(bad) = rules.iter().find(|r| r.min_f > r.max_f) {
            return Err(RuleTableError::InvertedRange(bad.id.clone()));
        }
        Ok(Self { rules })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, RuleTableError> {
        let parsed: WeatherRules =
            serde_yaml::from_str(yaml).map_err(|e| RuleTableError::Parse(e.to_string()))?;
        Self::new(parsed.rules)
    }

    /// Rule for a forecast, per the keyword-then-range order
    pub fn select(&self, forecast: &DailyForecast) -> Option<&WeatherRule> {
        let in_range = || self.rules.iter().filter(|r| r.contains(forecast.high_f));
        in_range()
            .find(|r| r.matches_conditions(&forecast.conditions))
            .or_else(|| in_range().next())
    }

    /// Annotated copy of `day`; unannotated copy when no rule applies
    pub fn annotate(&self, day: &DayPlan, forecast: &DailyForecast) -> DayPlan {
        let mut out = day.clone();
        let Some(rule) = self.select(forecast) else {
            return out;
        };

        let mut adjustments = Vec::new();
        for slot in out.slots_mut() {
            let scheduled = std::mem::take(slot);
            for activity in scheduled {
                if !rule.disallowed.iter().any(|tag| tag_matches(tag, &activity)) {
                    slot.push(activity);
                    continue;
                }
                match indoor_alternative(&activity) {
                    Some(alt) => {
                        adjustments.push(format!("replaced '{}' with '{}'", activity, alt));
                        slot.push(alt);
                    }
                    None => adjustments.push(format!("dropped '{}'", activity)),
                }
            }
        }
        if !adjustments.is_empty() {
            debug!(day = day.day_number, rule = %rule.id, changes = adjustments.len(), "weather adjusted activities");
        }

        out.weather = Some(WeatherAnnotation {
            rule: rule.id.clone(),
            high_f: forecast.high_f,
            low_f: forecast.low_f,
            conditions: forecast.conditions.clone(),
            clothing: rule.clothing.clone(),
            recommended: rule.recommended.clone(),
            note: rule.note.clone(),
            adjustments,
        });
        out
    }

    /// Annotate each day that has a forecast for its date
    pub fn correlate(&self, itinerary: &[DayPlan], forecasts: &[DailyForecast]) -> Vec<DayPlan> {
        let by_date: HashMap<_, _> = forecasts.iter().map(|f| (f.date, f)).collect();
        itinerary
            .iter()
            .map(|day| match by_date.get(&day.date) {
                Some(forecast) => self.annotate(day, forecast),
                None => day.clone(),
            })
            .collect()
    }
}

impl Default for WeatherRules {
    fn default() -> Self {
        Self {
            rules: vec![
                // Range-only base rules, the fallback for any condition
                WeatherRule::new("pleasant", 65.0, 90.0)
                    .with_recommended(&["walking tours", "outdoor dining", "parks", "river walks"])
                    .with_clothing(&["light layers", "comfortable walking shoes", "sunglasses"])
                    .with_note("Pleasant weather: a good day to be outside."),
                WeatherRule::new("hot", 90.0, 200.0)
                    .with_disallowed(&["strenuous hiking"])
                    .with_recommended(&["early-morning sightseeing", "swimming", "shaded cafés"])
                    .with_clothing(&["light clothing", "sun hat", "sunscreen"])
                    .with_note("Hot day: plan breaks in the shade."),
                WeatherRule::new("cool", 45.0, 65.0)
                    .with_recommended(&["walking tours", "museums", "cafés"])
                    .with_clothing(&["layers", "light jacket"])
                    .with_note("Cool day: bring a layer for the evening."),
                WeatherRule::new("cold", -100.0, 45.0)
                    .with_disallowed(&["beach", "swimming", "outdoor dining"])
                    .with_recommended(&["museums", "concert halls", "cosy restaurants"])
                    .with_clothing(&["warm coat", "scarf", "gloves"])
                    .with_note("Cold day: dress warmly and plan indoor breaks."),
                // Keyword rules; only reachable through a condition match
                WeatherRule::new("heat_wave", 90.0, 200.0)
                    .with_keywords(&["sunny", "clear"])
                    .with_disallowed(&["hiking", "intensive walking tours", "outdoor sports", "cycling"])
                    .with_recommended(&["museums", "indoor markets", "evening river cruise", "shaded gardens"])
                    .with_clothing(&["light breathable clothing", "sun hat", "sunscreen", "refillable water bottle"])
                    .with_note("Extreme heat: keep outdoor time to early morning or evening."),
                WeatherRule::new("hot_humid", 85.0, 200.0)
                    .with_keywords(&["cloudy", "overcast", "humid"])
                    .with_disallowed(&["strenuous hiking", "intensive walking tours"])
                    .with_recommended(&["swimming", "air-conditioned galleries", "rooftop bars after sunset"])
                    .with_clothing(&["light clothing", "sunscreen"])
                    .with_note("Hot and muggy: pace yourself and stay hydrated."),
                WeatherRule::new("warm_storms", 60.0, 200.0)
                    .with_keywords(&["thunderstorm"])
                    .with_disallowed(&["hiking", "outdoor dining", "beach", "boat tour", "cycling"])
                    .with_recommended(&["museums", "covered markets", "cooking class"])
                    .with_clothing(&["rain jacket", "quick-dry shoes"])
                    .with_note("Thunderstorms likely: keep plans flexible and stay indoors during storms."),
                WeatherRule::new("mild_rain", 45.0, 200.0)
                    .with_keywords(&["rain", "drizzle"])
                    .with_disallowed(&["outdoor dining", "picnic", "outdoor markets", "beach", "hiking"])
                    .with_recommended(&["museums", "galleries", "covered passages", "cafés"])
                    .with_clothing(&["umbrella", "waterproof jacket", "water-resistant shoes"])
                    .with_note("Rain expected: favour indoor sights and carry an umbrella."),
                WeatherRule::new("snow", -100.0, 40.0)
                    .with_keywords(&["snow"])
                    .with_disallowed(&["cycling", "outdoor dining", "beach", "boat tour"])
                    .with_recommended(&["winter markets", "museums", "thermal baths"])
                    .with_clothing(&["insulated coat", "waterproof boots", "gloves", "hat"])
                    .with_note("Snow forecast: allow extra travel time."),
            ],
        }
    }
}

/// Case-insensitive containment of the tag, or of the tag with leading
/// qualifiers removed
fn tag_matches(tag: &str, activity: &str) -> bool {
    let activity = activity.to_lowercase();
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        return false;
    }
    if activity.contains(&tag) {
        return true;
    }
    let core = strip_qualifiers(&tag);
    !core.is_empty() && core != tag && activity.contains(core)
}

fn strip_qualifiers(tag: &str) -> &str {
    let mut rest = tag.trim();
    loop {
        let Some(word) = rest.split_whitespace().next() else {
            return rest;
        };
        if !QUALIFIERS.contains(&word) {
            return rest;
        }
        rest = rest[word.len()..].trim_start();
    }
}

/// "Outdoor yoga" → "Indoor yoga (weather alternative)"
fn indoor_alternative(activity: &str) -> Option<String> {
    let lower = activity.to_ascii_lowercase();
    let at = lower.find("outdoor")?;
    let original = &activity[at..at + "outdoor".len()];
    let replacement = if original.starts_with('O') { "Indoor" } else { "indoor" };
    Some(format!(
        "{}{}{}{}",
        &activity[..at],
        replacement,
        &activity[at + "outdoor".len()..],
        ALTERNATIVE_SUFFIX
    ))
}

/// One-paragraph overview of the trip's weather
pub fn weather_summary(forecasts: &[DailyForecast]) -> Option<String> {
    if forecasts.is_empty() {
        return None;
    }
    let (mut hi_min, mut hi_max) = (f64::MAX, f64::MIN);
    let (mut lo_min, mut lo_max) = (f64::MAX, f64::MIN);
    let mut counts: Vec<(String, usize)> = Vec::new();
    for f in forecasts {
        hi_min = hi_min.min(f.high_f);
        hi_max = hi_max.max(f.high_f);
        lo_min = lo_min.min(f.low_f);
        lo_max = lo_max.max(f.low_f);
        // Lead keyword only, so "clear"/"sunny" pairs count once per day
        if let Some(c) = f.conditions.first() {
            let c = c.to_lowercase();
            match counts.iter_mut().find(|(name, _)| *name == c) {
                Some((_, n)) => *n += 1,
                None => counts.push((c, 1)),
            }
        }
    }
    // Stable: ties keep first appearance
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let range = |lo: f64, hi: f64| {
        if (hi - lo).abs() < 0.5 {
            format!("{:.0}°F", hi)
        } else {
            format!("{:.0}-{:.0}°F", lo, hi)
        }
    };
    let mut summary = format!(
        "Expect highs of {} and lows of {} over {} day{}.",
        range(hi_min, hi_max),
        range(lo_min, lo_max),
        forecasts.len(),
        if forecasts.len() == 1 { "" } else { "s" }
    );
    match counts.as_slice() {
        [] => {}
        [(only, _)] => summary.push_str(&format!(" Conditions: {}.", only)),
        [(first, _), (second, _), ..] => {
            summary.push_str(&format!(" Mostly {}, with some {}.", first, second))
        }
    }
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    fn forecast(day: u32, high: f64, conditions: &[&str]) -> DailyForecast {
        DailyForecast {
            date: date(day),
            high_f: high,
            low_f: high - 18.0,
            conditions: conditions.iter().map(|s| s.to_string()).collect(),
            precipitation_chance: None,
        }
    }

    fn day(activities: &[&str]) -> DayPlan {
        let mut plan = DayPlan::empty(1, date(1));
        plan.morning = activities.iter().map(|s| s.to_string()).collect();
        plan.afternoon = vec!["Lunch at Septime".into()];
        plan
    }

    #[test]
    fn test_heat_drops_hiking() {
        let rules = WeatherRules::default();
        let plan = day(&["Hiking in the Calanques", "Visit the Louvre", "Sunset HIKING trail"]);
        let annotated = rules.annotate(&plan, &forecast(1, 95.0, &["sunny"]));

        assert_eq!(annotated.morning, vec!["Visit the Louvre".to_string()]);
        assert_eq!(annotated.afternoon, plan.afternoon);
        let weather = annotated.weather.unwrap();
        assert_eq!(weather.rule, "heat_wave");
        assert_eq!(weather.adjustments.len(), 2);
        assert!(weather.clothing.iter().any(|c| c.contains("sun")));
    }

    #[test]
    fn test_qualifier_stripping_and_outdoor_rewrite() {
        let rules = WeatherRules::default();
        let plan = day(&["Outdoor sports at Bois de Boulogne", "Guided walking tours of Marais"]);
        let annotated = rules.annotate(&plan, &forecast(1, 96.0, &["clear"]));

        // "intensive walking tours" matches via "walking tours"; no "outdoor" to rewrite
        assert_eq!(
            annotated.morning,
            vec!["Indoor sports at Bois de Boulogne (weather alternative)".to_string()]
        );
    }

    #[test]
    fn test_indoor_activities_survive() {
        let rules = WeatherRules::default();

        let cold = rules.annotate(&day(&["Fine dining at Le Cinq"]), &forecast(1, 40.0, &["overcast"]));
        assert_eq!(cold.weather.as_ref().unwrap().rule, "cold");
        assert_eq!(cold.morning, vec!["Fine dining at Le Cinq".to_string()]);
        assert!(cold.weather.unwrap().adjustments.is_empty());

        let rain = rules.annotate(
            &day(&["Visit the covered markets", "Outdoor markets in Belleville"]),
            &forecast(1, 62.0, &["rain"]),
        );
        assert_eq!(rain.weather.as_ref().unwrap().rule, "mild_rain");
        assert_eq!(
            rain.morning,
            vec![
                "Visit the covered markets".to_string(),
                "Indoor markets in Belleville (weather alternative)".to_string(),
            ]
        );

        let heat = rules.annotate(
            &day(&["Indoor climbing at Arkose", "Team sports bar"]),
            &forecast(1, 96.0, &["sunny"]),
        );
        assert_eq!(heat.weather.as_ref().unwrap().rule, "heat_wave");
        assert_eq!(
            heat.morning,
            vec!["Indoor climbing at Arkose".to_string(), "Team sports bar".to_string()]
        );
    }

    #[test]
    fn test_range_only_fallback() {
        let rules = WeatherRules::default();
        // 95°F but no sunny/clear/humid/storm keyword: falls back to first range match
        let selected = rules.select(&forecast(1, 95.0, &["fog"])).unwrap();
        assert_eq!(selected.id, "hot");

        let selected = rules.select(&forecast(1, 70.0, &["partly cloudy"])).unwrap();
        assert_eq!(selected.id, "pleasant");
        let selected = rules.select(&forecast(1, 90.0, &[])).unwrap();
        assert_eq!(selected.id, "pleasant");
        let selected = rules.select(&forecast(1, 70.0, &["rain"])).unwrap();
        assert_eq!(selected.id, "mild_rain");
    }

    #[test]
    fn test_no_rule_leaves_day_untouched() {
        let rules = WeatherRules::new(vec![WeatherRule::new("only_cold", -50.0, 30.0)]).unwrap();
        let plan = day(&["Hiking"]);
        let annotated = rules.annotate(&plan, &forecast(1, 75.0, &["sunny"]));
        assert_eq!(annotated, plan);
    }

    #[test]
    fn test_correlate_by_date() {
        let rules = WeatherRules::default();
        let mut second = DayPlan::empty(2, date(2));
        second.morning.push("Picnic on the Champ de Mars".into());
        let itinerary = vec![day(&["Louvre"]), second, DayPlan::empty(3, date(3))];
        let forecasts = vec![forecast(2, 62.0, &["rain"]), forecast(1, 75.0, &["sunny"])];

        let out = rules.correlate(&itinerary, &forecasts);
        assert_eq!(out[0].weather.as_ref().unwrap().rule, "pleasant");
        assert!(out[1].morning.is_empty());
        assert_eq!(out[1].weather.as_ref().unwrap().rule, "mild_rain");
        assert!(out[2].weather.is_none());
    }

    #[test]
    fn test_rules_from_yaml() {
        let yaml = r#"
rules:
  - id: scorcher
    min_f: 100
    max_f: 150
    keywords: [sunny]
    disallowed: [running]
"#;
        let rules = WeatherRules::from_yaml(yaml).unwrap();
        assert_eq!(rules.rules.len(), 1);
        assert!(rules.rules[0].clothing.is_empty());

        let inverted = "rules:\n  - id: bad\n    min_f: 80\n    max_f: 20\n";
        assert!(matches!(
            WeatherRules::from_yaml(inverted),
            Err(RuleTableError::InvertedRange(_))
        ));
    }

    #[test]
    fn test_weather_summary() {
        assert!(weather_summary(&[]).is_none());
        let summary = weather_summary(&[
            forecast(1, 95.0, &["sunny"]),
            forecast(2, 88.0, &["sunny"]),
            forecast(3, 80.0, &["rain"]),
        ])
        .unwrap();
        assert!(summary.contains("80-95°F"));
        assert!(summary.contains("3 days"));
        assert!(summary.contains("Mostly sunny, with some rain"));
    }
}
