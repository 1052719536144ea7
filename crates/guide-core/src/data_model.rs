//! Data Model: request, provider payloads, and the Guide aggregate
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// REQUEST & PREFERENCES
// ============================================================================

/// Incoming guide request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideRequest {
    /// Destination as typed by the traveler (ex: "Paris")
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Hotel or address the itinerary should start from
    #[serde(default)]
    pub accommodation: Option<String>,
    #[serde(default)]
    pub preferences: TravelPreferences,
    /// When set, the finished guide is persisted under this trip id
    #[serde(default)]
    pub trip_id: Option<String>,
}

/// Budget tier, written as `$`..`$$$$` or as a word
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BudgetTier {
    Budget,
    #[default]
    Moderate,
    Upscale,
    Luxury,
}

impl BudgetTier {
    pub fn symbol(&self) -> &'static str {
        match self {
            BudgetTier::Budget => "$",
            BudgetTier::Moderate => "$$",
            BudgetTier::Upscale => "$$$",
            BudgetTier::Luxury => "$$$$",
        }
    }

    /// Price level on the 1..=4 scale places providers use
    pub fn price_level(&self) -> u8 {
        match self {
            BudgetTier::Budget => 1,
            BudgetTier::Moderate => 2,
            BudgetTier::Upscale => 3,
            BudgetTier::Luxury => 4,
        }
    }
}

impl TryFrom<String> for BudgetTier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "$" | "budget" | "low" | "cheap" => Ok(BudgetTier::Budget),
            "$$" | "moderate" | "medium" | "mid" => Ok(BudgetTier::Moderate),
            "$$$" | "upscale" | "high" => Ok(BudgetTier::Upscale),
            "$$$$" | "luxury" | "premium" => Ok(BudgetTier::Luxury),
            other => Err(format!("unknown budget tier '{}'", other)),
        }
    }
}

impl From<BudgetTier> for String {
    fn from(tier: BudgetTier) -> Self {
        tier.symbol().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Solo,
    Couple,
    Family,
    Friends,
    Business,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Relaxed,
    Moderate,
    Packed,
}

/// Traveler preferences feeding persona classification and prompts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelPreferences {
    #[serde(default)]
    pub budget: BudgetTier,

    /// Declared interests, trimmed and lowercased
    #[serde(default, deserialize_with = "deserialize_interests")]
    pub interests: BTreeSet<String>,

    #[serde(default)]
    pub group_type: Option<GroupType>,

    #[serde(default)]
    pub pace: Option<Pace>,

    /// 0 (cautious) to 10 (thrill-seeking)
    #[serde(default)]
    pub adventurousness: Option<u8>,
}

impl TravelPreferences {
    pub fn new(budget: BudgetTier) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    pub fn with_interest(mut self, interest: impl AsRef<str>) -> Self {
        let normalized = normalize_interest(interest.as_ref());
        if !normalized.is_empty() {
            self.interests.insert(normalized);
        }
        self
    }

    pub fn with_group(mut self, group: GroupType) -> Self {
        self.group_type = Some(group);
        self
    }

    pub fn with_pace(mut self, pace: Pace) -> Self {
        self.pace = Some(pace);
        self
    }

    pub fn with_adventurousness(mut self, level: u8) -> Self {
        self.adventurousness = Some(level.min(10));
        self
    }
}

fn normalize_interest(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Dedupe key for places and recommendations: lowercase alphanumerics only
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn deserialize_interests<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .map(|s| normalize_interest(s))
        .filter(|s| !s.is_empty())
        .collect())
}

/// Traveler archetypes, in tie-break priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaTag {
    CulturalExplorer,
    LuxuryConnoisseur,
    AdventureSeeker,
    Foodie,
    FamilyTraveler,
    BudgetBackpacker,
    WellnessSeeker,
}

impl PersonaTag {
    /// Declaration order doubles as the tie-break order
    pub const ALL: [PersonaTag; 7] = [
        PersonaTag::CulturalExplorer,
        PersonaTag::LuxuryConnoisseur,
        PersonaTag::AdventureSeeker,
        PersonaTag::Foodie,
        PersonaTag::FamilyTraveler,
        PersonaTag::BudgetBackpacker,
        PersonaTag::WellnessSeeker,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            PersonaTag::CulturalExplorer => "Cultural Explorer",
            PersonaTag::LuxuryConnoisseur => "Luxury Connoisseur",
            PersonaTag::AdventureSeeker => "Adventure Seeker",
            PersonaTag::Foodie => "Foodie",
            PersonaTag::FamilyTraveler => "Family Traveler",
            PersonaTag::BudgetBackpacker => "Budget Backpacker",
            PersonaTag::WellnessSeeker => "Wellness Seeker",
        }
    }
}

impl fmt::Display for PersonaTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// PROVIDER RECORDS
// ============================================================================

/// One day of forecast from the weather provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    /// Daily high in °F
    pub high_f: f64,
    /// Daily low in °F
    pub low_f: f64,
    /// Condition keywords (ex: "sunny", "light rain")
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub precipitation_chance: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceCategory {
    Restaurant,
    Attraction,
    Other,
}

/// A record from the places/geocoding provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub price_level: Option<u8>,
    #[serde(default = "default_place_category")]
    pub category: PlaceCategory,
    #[serde(default)]
    pub types: Vec<String>,
}

fn default_place_category() -> PlaceCategory {
    PlaceCategory::Other
}

/// A record from the events provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// A recommended place (restaurant, attraction, hidden gem)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub price_level: Option<u8>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Recommendation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_price_level(mut self, level: u8) -> Self {
        self.price_level = Some(level);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub best_for: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticalInfo {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub emergency_number: Option<String>,
    #[serde(default)]
    pub transportation: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

impl PracticalInfo {
    pub fn is_empty(&self) -> bool {
        self.currency.is_none()
            && self.language.is_none()
            && self.emergency_number.is_none()
            && self.transportation.is_empty()
            && self.tips.is_empty()
    }
}

/// One itinerary day as returned by the search provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDay {
    #[serde(default)]
    pub day: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub morning: Vec<String>,
    #[serde(default)]
    pub afternoon: Vec<String>,
    #[serde(default)]
    pub evening: Vec<String>,
}

/// Structured content parsed from the search/LLM provider reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchContent {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub destination_insights: String,
    #[serde(default)]
    pub itinerary: Vec<SearchDay>,
    #[serde(default)]
    pub restaurants: Vec<Recommendation>,
    #[serde(default)]
    pub attractions: Vec<Recommendation>,
    #[serde(default)]
    pub hidden_gems: Vec<Recommendation>,
    #[serde(default)]
    pub neighborhoods: Vec<Neighborhood>,
    #[serde(default)]
    pub practical_info: PracticalInfo,
}

// ============================================================================
// GUIDE AGGREGATE
// ============================================================================

/// Weather rule applied to one itinerary day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAnnotation {
    /// Id of the correlation rule that matched
    pub rule: String,
    pub high_f: f64,
    pub low_f: f64,
    pub conditions: Vec<String>,
    pub clothing: Vec<String>,
    pub recommended: Vec<String>,
    pub note: String,
    /// Activities rewritten or dropped because of the weather
    #[serde(default)]
    pub adjustments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// 1-based day index
    pub day_number: u32,
    pub date: NaiveDate,
    pub title: String,
    pub morning: Vec<String>,
    pub afternoon: Vec<String>,
    pub evening: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherAnnotation>,
}

impl DayPlan {
    pub fn empty(day_number: u32, date: NaiveDate) -> Self {
        Self {
            day_number,
            date,
            title: format!("Day {}", day_number),
            morning: Vec::new(),
            afternoon: Vec::new(),
            evening: Vec::new(),
            weather: None,
        }
    }

    pub fn activity_count(&self) -> usize {
        self.morning.len() + self.afternoon.len() + self.evening.len()
    }

    /// Morning, afternoon and evening lists in order
    pub fn slots_mut(&mut self) -> [&mut Vec<String>; 3] {
        [&mut self.morning, &mut self.afternoon, &mut self.evening]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    RequiredSection,
    MinTextLength,
    MinItemCount,
    ItemCompleteness,
}

impl ValidationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationRule::RequiredSection => "required_section",
            ValidationRule::MinTextLength => "min_text_length",
            ValidationRule::MinItemCount => "min_item_count",
            ValidationRule::ItemCompleteness => "item_completeness",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single failed quality gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: ValidationRule,
    /// Guide section the rule was checked against (ex: "summary")
    pub section: String,
    pub message: String,
    /// Threshold the rule expects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<usize>,
    /// Value found in the draft
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<usize>,
    /// Whether auto-repair knows a compliant placeholder for it
    pub fixable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    /// Item count per section
    pub section_counts: BTreeMap<String, usize>,
    pub passed: bool,
    #[serde(default)]
    pub repair_attempted: bool,
}

impl ValidationReport {
    /// Report attached to drafts before validation runs
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn violations_for(&self, section: &str) -> impl Iterator<Item = &Violation> {
        let section = section.to_string();
        self.violations.iter().filter(move |v| v.section == section)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTiming {
    /// "success" | "failure:<kind>" | "timeout"
    pub outcome: String,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingMetadata {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_ms: u64,
    pub providers: BTreeMap<String, ProviderTiming>,
}

impl TimingMetadata {
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            started_at: at,
            finished_at: at,
            total_ms: 0,
            providers: BTreeMap::new(),
        }
    }
}

/// The finished travel guide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    pub id: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: u32,
    #[serde(default)]
    pub accommodation: Option<String>,
    pub summary: String,
    pub destination_insights: String,
    pub itinerary: Vec<DayPlan>,
    pub restaurants: Vec<Recommendation>,
    pub attractions: Vec<Recommendation>,
    pub events: Vec<EventRecord>,
    pub practical_info: PracticalInfo,
    pub hidden_gems: Vec<Recommendation>,
    pub neighborhoods: Vec<Neighborhood>,
    pub persona: PersonaTag,
    /// Whether list sections were re-ranked for the persona
    pub personalized: bool,
    #[serde(default)]
    pub weather_summary: Option<String>,
    pub validation: ValidationReport,
    /// 0-100
    pub quality_score: u32,
    pub timing: TimingMetadata,
}

impl Guide {
    /// Empty guide shell for a trip; sections are filled by assembly
    pub fn new(
        id: impl Into<String>,
        destination: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        persona: PersonaTag,
    ) -> Self {
        let duration_days = ((end_date - start_date).num_days() + 1).max(1) as u32;
        Self {
            id: id.into(),
            destination: destination.into(),
            start_date,
            end_date,
            duration_days,
            accommodation: None,
            summary: String::new(),
            destination_insights: String::new(),
            itinerary: Vec::new(),
            restaurants: Vec::new(),
            attractions: Vec::new(),
            events: Vec::new(),
            practical_info: PracticalInfo::default(),
            hidden_gems: Vec::new(),
            neighborhoods: Vec::new(),
            persona,
            personalized: false,
            weather_summary: None,
            validation: ValidationReport::pending(),
            quality_score: 0,
            timing: TimingMetadata::started(Utc::now()),
        }
    }

    pub fn weather_annotated_days(&self) -> usize {
        self.itinerary.iter().filter(|d| d.weather.is_some()).count()
    }
}
