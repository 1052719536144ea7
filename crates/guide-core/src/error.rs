//! Unified Error Model
//!
//! Provider-level failures never appear here: adapters convert them into
//! `ProviderResult::Failure`/`Timeout`. Only the errors below reach callers.
use crate::data_model::{Guide, Violation};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuideError {
    /// Missing credentials or an unusable configuration value
    #[error("CONFIG/{field}: {message}")]
    Configuration { field: String, message: String },

    /// The request itself is malformed (dates, destination)
    #[error("REQUEST/{0}")]
    InvalidRequest(String),

    /// A provider marked critical did not succeed
    #[error("PROVIDER/CRITICAL: {provider} failed: {cause}")]
    CriticalProviderFailure { provider: String, cause: String },

    /// Quality gates still failing after the repair pass
    #[error("QLT/VALIDATION: {} violation(s) remain (repair attempted: {repair_attempted})", .violations.len())]
    ValidationFailure {
        partial_guide: Box<Guide>,
        violations: Vec<Violation>,
        repair_attempted: bool,
    },

    /// Trip persistence collaborator failed
    #[error("STORE/{0}")]
    Storage(String),
}

impl GuideError {
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        GuideError::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code in `AREA/DETAIL` form
    pub fn code(&self) -> &'static str {
        match self {
            GuideError::Configuration { .. } => "CONFIG/INVALID",
            GuideError::InvalidRequest(_) => "REQUEST/INVALID",
            GuideError::CriticalProviderFailure { .. } => "PROVIDER/CRITICAL",
            GuideError::ValidationFailure { .. } => "QLT/VALIDATION",
            GuideError::Storage(_) => "STORE/FAILED",
        }
    }

    /// Structured payload naming the failing field, provider or rules
    pub fn details(&self) -> Value {
        match self {
            GuideError::Configuration { field, message } => json!({
                "field": field,
                "message": message,
            }),
            GuideError::InvalidRequest(message) => json!({ "message": message }),
            GuideError::CriticalProviderFailure { provider, cause } => json!({
                "provider": provider,
                "cause": cause,
            }),
            GuideError::ValidationFailure {
                partial_guide,
                violations,
                repair_attempted,
            } => json!({
                "violations": violations,
                "repair_attempted": repair_attempted,
                "partial_guide": partial_guide,
            }),
            GuideError::Storage(message) => json!({ "message": message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let err = GuideError::configuration("providers.search.api_key", "missing");
        assert_eq!(err.code(), "CONFIG/INVALID");
        assert_eq!(
            err.to_string(),
            "CONFIG/providers.search.api_key: missing"
        );

        let err = GuideError::CriticalProviderFailure {
            provider: "search".to_string(),
            cause: "timeout".to_string(),
        };
        assert_eq!(err.code(), "PROVIDER/CRITICAL");
        assert_eq!(err.details()["provider"], "search");
    }
}
