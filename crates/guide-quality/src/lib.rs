//! Guide Quality: validation and auto-repair for assembled guides
//!
//! ```ignore
//! use guide_quality::{QualityGate, ValidationProfile};
//!
//! let gate = QualityGate::new(ValidationProfile::standard());
//! let outcome = gate.run(draft);
//! if !outcome.passed() {
//!     println!("{} violations", outcome.report.violations.len());
//! }
//! ```
//!
//! The gate validates, repairs at most once, and re-validates the repaired
//! draft. It never fails on its own; the caller decides what a failed
//! outcome means.

pub mod profile;
pub mod repair;
pub mod validator;

pub use profile::{ProfileError, ValidationProfile};
pub use repair::{is_placeholder, repair, repair_with, PLACEHOLDER_MARK};
pub use validator::{validate, Validator};

use guide_core::{Guide, ValidationReport};
use tracing::warn;

/// Draft (possibly repaired) plus its final report
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub guide: Guide,
    pub report: ValidationReport,
    /// First-pass report, kept when a repair ran
    pub original: Option<ValidationReport>,
}

impl GateOutcome {
    pub fn passed(&self) -> bool {
        self.report.passed
    }

    /// Report the caller should surface on failure: the first-pass one
    /// with the repair flag set, or the only report when no repair ran
    pub fn failure_report(&self) -> ValidationReport {
        match &self.original {
            Some(original) => ValidationReport {
                repair_attempted: self.report.repair_attempted,
                ..original.clone()
            },
            None => self.report.clone(),
        }
    }
}

pub struct QualityGate {
    validator: Validator,
}

impl QualityGate {
    pub fn new(profile: ValidationProfile) -> Self {
        Self {
            validator: Validator::new(profile),
        }
    }

    pub fn for_profile(name: &str) -> Result<Self, ProfileError> {
        Ok(Self::new(ValidationProfile::named(name)?))
    }

    pub fn profile(&self) -> &ValidationProfile {
        self.validator.profile()
    }

    pub fn run(&self, draft: Guide) -> GateOutcome {
        let report = self.validator.validate(&draft);
        if report.passed {
            return GateOutcome { guide: draft, report, original: None };
        }

        match repair_with(self.profile(), &draft, &report) {
            Some(repaired) => {
                let mut second = self.validator.validate(&repaired);
                second.repair_attempted = true;
                if !second.passed {
                    warn!(
                        guide = %repaired.id,
                        violations = second.violations.len(),
                        "draft still invalid after repair"
                    );
                }
                GateOutcome {
                    guide: repaired,
                    report: second,
                    original: Some(report),
                }
            }
            None => {
                warn!(guide = %draft.id, violations = report.violations.len(), "no repairable violations");
                GateOutcome { guide: draft, report, original: None }
            }
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(ValidationProfile::standard())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;
    use guide_core::{DayPlan, Guide, PersonaTag, Recommendation};

    /// A guide every standard rule accepts
    pub fn complete_guide() -> Guide {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        let mut guide = Guide::new("guide-1", "Paris", start, end, PersonaTag::LuxuryConnoisseur);
        guide.summary = "Three days of Paris in early June: galleries, gardens and long dinners.".into();
        guide.destination_insights = "June brings long evenings and the Fête de la Musique.".into();
        guide.itinerary = (1..=3)
            .map(|n| {
                let mut day = DayPlan::empty(n, start + chrono::Duration::days(i64::from(n - 1)));
                day.morning.push(format!("Museum visit {}", n));
                day
            })
            .collect();
        guide.restaurants = vec![Recommendation::new("Le Jules Verne"), Recommendation::new("Septime")];
        guide.attractions = vec![Recommendation::new("Louvre"), Recommendation::new("Musée d'Orsay")];
        guide
    }
}
