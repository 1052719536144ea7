//! Markdown renderer
//!
//! Handlebars with HTML escaping turned off, plus a few formatting helpers:
//! - `long_date`: `2025-06-01` → `Sun, Jun 1 2025`
//! - `price_tag`: price level 3 → `$$$`
//! - `stars`: rating 4.5 → `(4.5★)`
//! - `temp`: 71.6 → `72°F`
//! - `join`: array with a separator (default `", "`)
//! - `truncate`: string cut to N chars with an ellipsis

use crate::templates::TemplateSet;
use crate::{GuideRenderer, RenderError};
use chrono::NaiveDate;
use guide_core::Guide;
use handlebars::{
    handlebars_helper, no_escape, Context, Handlebars, Helper, HelperDef, HelperResult, Output,
    RenderContext,
};
use serde_json::{json, Value};

pub const DEFAULT_TEMPLATE: &str = "guide";

pub struct MarkdownRenderer {
    handlebars: Handlebars<'static>,
    template: String,
}

impl MarkdownRenderer {
    /// Renderer over the built-in templates
    pub fn new() -> Result<Self, RenderError> {
        Self::from_templates(TemplateSet::builtin()?)
    }

    pub fn from_templates(set: TemplateSet) -> Result<Self, RenderError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(no_escape);

        handlebars.register_helper("long_date", Box::new(long_date));
        handlebars.register_helper("price_tag", Box::new(price_tag));
        handlebars.register_helper("stars", Box::new(stars));
        handlebars.register_helper("temp", Box::new(temp));
        handlebars.register_helper("join", Box::new(JoinHelper));
        handlebars.register_helper("truncate", Box::new(TruncateHelper));

        for (name, template) in &set.templates {
            handlebars
                .register_template_string(name, &template.template)
                .map_err(|e| RenderError::Template(format!("{}: {}", name, e)))?;
        }

        let template = if set.get(DEFAULT_TEMPLATE).is_some() {
            DEFAULT_TEMPLATE.to_string()
        } else {
            set.names().first().map(|s| s.to_string()).unwrap_or_default()
        };
        Ok(Self { handlebars, template })
    }

    /// Render with another registered template
    pub fn with_template(mut self, name: &str) -> Result<Self, RenderError> {
        if !self.handlebars.has_template(name) {
            return Err(RenderError::UnknownTemplate(name.to_string()));
        }
        self.template = name.to_string();
        Ok(self)
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

/// Serialized guide plus the few derived values templates need
fn context(guide: &Guide) -> Result<Value, RenderError> {
    let mut value = serde_json::to_value(guide).map_err(|e| RenderError::Render(e.to_string()))?;
    if let Value::Object(map) = &mut value {
        map.insert("persona_label".into(), json!(guide.persona.label()));
        map.insert("has_practical_info".into(), json!(!guide.practical_info.is_empty()));
    }
    Ok(value)
}

impl GuideRenderer for MarkdownRenderer {
    fn render(&self, guide: &Guide) -> Result<String, RenderError> {
        let data = context(guide)?;
        self.handlebars
            .render(&self.template, &data)
            .map_err(|e| RenderError::Render(e.to_string()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn format_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%a, %b %-d %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

handlebars_helper!(long_date: |date: str| format_date(date));

handlebars_helper!(price_tag: |level: Json| {
    level.as_u64().map(|n| "$".repeat(n.min(4) as usize)).unwrap_or_default()
});

handlebars_helper!(stars: |rating: Json| {
    rating.as_f64().map(|r| format!("({:.1}★)", r)).unwrap_or_default()
});

handlebars_helper!(temp: |degrees: f64| format!("{:.0}°F", degrees));

struct JoinHelper;

impl HelperDef for JoinHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let separator = h.param(1).and_then(|v| v.value().as_str()).unwrap_or(", ");
        if let Some(items) = h.param(0).and_then(|v| v.value().as_array()) {
            let parts: Vec<String> = items
                .iter()
                .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
                .collect();
            out.write(&parts.join(separator))?;
        }
        Ok(())
    }
}

struct TruncateHelper;

impl HelperDef for TruncateHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let text = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
        let max = h.param(1).and_then(|v| v.value().as_u64()).unwrap_or(100) as usize;

        if text.chars().count() > max {
            let cut: String = text.chars().take(max).collect();
            out.write(cut.trim_end())?;
            out.write("...")?;
        } else {
            out.write(text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use guide_core::{DayPlan, EventRecord, PersonaTag, Recommendation, WeatherAnnotation};

    fn guide() -> Guide {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let mut guide = Guide::new("g-1", "Paris", start, end, PersonaTag::LuxuryConnoisseur);
        guide.summary = "Two days of galleries & long dinners <by the river>.".into();
        guide.accommodation = Some("Hôtel Plaza Athénée".into());

        let mut day = DayPlan::empty(1, start);
        day.title = "Left Bank".into();
        day.morning = vec!["Musée d'Orsay".into(), "Café de Flore".into()];
        day.weather = Some(WeatherAnnotation {
            rule: "pleasant".into(),
            high_f: 71.6,
            low_f: 58.2,
            conditions: vec!["sunny".into()],
            clothing: vec![],
            recommended: vec![],
            note: "Ideal for walking.".into(),
            adjustments: vec![],
        });
        guide.itinerary = vec![day, DayPlan::empty(2, end)];

        guide.restaurants = vec![Recommendation {
            rating: Some(4.5),
            ..Recommendation::new("Le Jules Verne")
                .with_description("Dinner in the Eiffel Tower")
                .with_price_level(4)
        }];
        guide.events = vec![EventRecord {
            name: "Fête de la Musique".into(),
            date: Some(end),
            venue: None,
            category: None,
            url: None,
            description: String::new(),
        }];
        guide.quality_score = 91;
        guide
    }

    #[test]
    fn test_renders_sections() {
        let md = MarkdownRenderer::new().unwrap().render(&guide()).unwrap();

        assert!(md.starts_with("# Paris Travel Guide"));
        assert!(md.contains(PersonaTag::LuxuryConnoisseur.label()));
        assert!(md.contains("Staying at **Hôtel Plaza Athénée**"));
        assert!(md.contains("### Day 1: Left Bank (Sun, Jun 1 2025)"));
        assert!(md.contains("- **Morning:** Musée d'Orsay; Café de Flore"));
        assert!(md.contains("72°F / 58°F, sunny"));
        assert!(md.contains("- **Le Jules Verne** $$$$ (4.5★): Dinner in the Eiffel Tower"));
        assert!(md.contains("**Fête de la Musique** (Mon, Jun 2 2025)"));
        assert!(md.contains("Quality score: 91/100"));
    }

    #[test]
    fn test_markdown_is_not_html_escaped() {
        let md = MarkdownRenderer::new().unwrap().render(&guide()).unwrap();
        assert!(md.contains("galleries & long dinners <by the river>"));
    }

    #[test]
    fn test_empty_sections_omitted() {
        let md = MarkdownRenderer::new().unwrap().render(&guide()).unwrap();
        assert!(!md.contains("## What to See"));
        assert!(!md.contains("## Hidden Gems"));
        assert!(!md.contains("## Practical Information"));
    }

    #[test]
    fn test_card_template_truncates() {
        let mut g = guide();
        g.summary = "word ".repeat(60);
        let card = MarkdownRenderer::new()
            .unwrap()
            .with_template("card")
            .unwrap()
            .render(&g)
            .unwrap();
        assert!(card.starts_with("**Paris**, 2 days"));
        assert!(card.trim_end().ends_with("..."));
    }

    #[test]
    fn test_unknown_template_rejected() {
        let err = MarkdownRenderer::new().unwrap().with_template("pdf").err().unwrap();
        assert!(matches!(err, RenderError::UnknownTemplate(_)));
    }

    #[test]
    fn test_custom_template_set() {
        let set = TemplateSet::from_yaml(
            "version: \"1.0\"\ntemplates:\n  short:\n    template: \"{{destination}} ({{price_tag 2}})\"\n",
        )
        .unwrap();
        let renderer = MarkdownRenderer::from_templates(set).unwrap();
        assert_eq!(renderer.template(), "short");
        assert_eq!(renderer.render(&guide()).unwrap(), "Paris ($$)");
    }

    #[test]
    fn test_format_date_passthrough() {
        assert_eq!(format_date("2025-06-01"), "Sun, Jun 1 2025");
        assert_eq!(format_date("soon"), "soon");
    }
}
