//! Template sets
//!
//! A template set is a YAML file of named Handlebars templates:
//!
//! ```yaml
//! version: "1.0"
//! templates:
//!   guide:
//!     description: Full travel guide
//!     template: "# {{destination}}"
//! ```

use crate::RenderError;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Templates shipped with the crate
const BUILTIN: &str = include_str!("../templates/markdown.yaml");

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSet {
    pub version: String,
    pub templates: BTreeMap<String, Template>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub description: String,
    pub template: String,
}

impl TemplateSet {
    pub fn builtin() -> Result<Self, RenderError> {
        Self::from_yaml(BUILTIN)
    }

    pub fn load(path: &str) -> Result<Self, RenderError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RenderError::Template(format!("{}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, RenderError> {
        let set: TemplateSet =
            serde_yaml::from_str(yaml).map_err(|e| RenderError::Template(e.to_string()))?;
        if set.templates.is_empty() {
            return Err(RenderError::Template("template set is empty".to_string()));
        }
        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_set_parses() {
        let set = TemplateSet::builtin().unwrap();
        assert_eq!(set.names(), vec!["card", "guide"]);
        assert!(set.get("guide").unwrap().template.contains("## Itinerary"));
    }

    #[test]
    fn test_empty_set_rejected() {
        let err = TemplateSet::from_yaml("version: \"1.0\"\ntemplates: {}\n").unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }
}
