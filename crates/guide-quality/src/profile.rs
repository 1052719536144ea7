//! Validation Profiles
//!
//! Thresholds the validator checks a draft guide against.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("QLT/PROFILE: {0}")]
    Parse(String),
    #[error("QLT/PROFILE: unknown profile '{0}'")]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationProfile {
    /// Profile name (e.g., "standard@1.0")
    pub name: String,

    // === Required Sections ===

    /// Sections that must be present (summary, itinerary, restaurants, attractions)
    pub required_sections: Vec<String>,

    // === Text Lengths ===

    pub min_summary_chars: usize,

    /// Only checked when insights are present
    pub min_insights_chars: usize,

    // === Item Counts ===

    pub min_restaurants: usize,
    pub min_attractions: usize,
    pub min_itinerary_days: usize,

    // === Completeness ===

    /// Names shorter than this mark an item incomplete
    pub min_name_chars: usize,

    /// A section fails when more than this share of its items is incomplete
    pub max_incomplete_ratio: f32,
}

impl ValidationProfile {
    pub fn standard() -> Self {
        Self {
            name: "standard@1.0".to_string(),
            required_sections: ["summary", "itinerary", "restaurants", "attractions"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_summary_chars: 50,
            min_insights_chars: 30,
            min_restaurants: 1,
            min_attractions: 1,
            min_itinerary_days: 1,
            min_name_chars: 3,
            max_incomplete_ratio: 0.5,
        }
    }

    /// Shorter text minimums; still requires every section
    pub fn lenient() -> Self {
        Self {
            name: "lenient@1.0".to_string(),
            min_summary_chars: 20,
            min_insights_chars: 10,
            min_name_chars: 2,
            max_incomplete_ratio: 0.75,
            ..Self::standard()
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ProfileError> {
        serde_yaml::from_str(yaml).map_err(|e| ProfileError::Parse(e.to_string()))
    }

    /// Look up a preset by name ("standard" or "lenient")
    pub fn named(name: &str) -> Result<Self, ProfileError> {
        match name.split('@').next().unwrap_or(name) {
            "standard" => Ok(Self::standard()),
            "lenient" => Ok(Self::lenient()),
            other => Err(ProfileError::Unknown(other.to_string())),
        }
    }

    pub fn requires(&self, section: &str) -> bool {
        self.required_sections.iter().any(|s| s == section)
    }
}

impl Default for ValidationProfile {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_thresholds() {
        let profile = ValidationProfile::standard();
        assert_eq!(profile.min_summary_chars, 50);
        assert_eq!(profile.min_insights_chars, 30);
        assert!(profile.requires("attractions"));
        assert!(!profile.requires("events"));
    }

    #[test]
    fn test_named_presets() {
        assert_eq!(ValidationProfile::named("lenient").unwrap().min_summary_chars, 20);
        assert_eq!(ValidationProfile::named("standard@1.0").unwrap(), ValidationProfile::standard());
        assert!(ValidationProfile::named("strict").is_err());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
name: custom@1.0
required_sections: [summary, itinerary]
min_summary_chars: 80
min_insights_chars: 0
min_restaurants: 0
min_attractions: 0
min_itinerary_days: 1
min_name_chars: 3
max_incomplete_ratio: 0.5
"#;
        let profile = ValidationProfile::from_yaml(yaml).unwrap();
        assert_eq!(profile.min_summary_chars, 80);
        assert!(!profile.requires("restaurants"));
    }
}
