//! Generation Context: per-request state owned by one guide generation
use crate::data_model::{GuideRequest, PersonaTag, TravelPreferences};
use crate::error::GuideError;
use chrono::{Duration, NaiveDate};
use once_cell::sync::OnceCell;

/// Longest trip the engine will plan
pub const MAX_TRIP_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub request_id: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive day count, always >= 1
    pub duration_days: u32,
    pub preferences: TravelPreferences,
    pub accommodation: Option<String>,
    persona: OnceCell<PersonaTag>,
}

/// Inclusive number of days between two dates
pub fn duration_days(start: NaiveDate, end: NaiveDate) -> Result<u32, GuideError> {
    if end < start {
        return Err(GuideError::InvalidRequest(format!(
            "end date {} is before start date {}",
            end, start
        )));
    }
    let days = (end - start).num_days() + 1;
    u32::try_from(days).map_err(|_| GuideError::InvalidRequest("date range too large".to_string()))
}

impl GenerationContext {
    pub fn new(
        destination: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        accommodation: Option<String>,
        preferences: TravelPreferences,
    ) -> Result<Self, GuideError> {
        let destination = destination.into().trim().to_string();
        if destination.is_empty() {
            return Err(GuideError::InvalidRequest("destination is empty".to_string()));
        }

        let duration_days = duration_days(start_date, end_date)?;
        if duration_days > MAX_TRIP_DAYS {
            return Err(GuideError::InvalidRequest(format!(
                "trip of {} days exceeds the {} day maximum",
                duration_days, MAX_TRIP_DAYS
            )));
        }

        Ok(Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            destination,
            start_date,
            end_date,
            duration_days,
            preferences,
            accommodation: accommodation.filter(|a| !a.trim().is_empty()),
            persona: OnceCell::new(),
        })
    }

    pub fn from_request(request: &GuideRequest) -> Result<Self, GuideError> {
        Self::new(
            request.destination.clone(),
            request.start_date,
            request.end_date,
            request.accommodation.clone(),
            request.preferences.clone(),
        )
    }

    /// Assign the persona. Returns false if one was already assigned.
    pub fn assign_persona(&self, persona: PersonaTag) -> bool {
        self.persona.set(persona).is_ok()
    }

    pub fn persona(&self) -> Option<PersonaTag> {
        self.persona.get().copied()
    }

    /// Every date of the trip, in order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.duration_days).map(move |offset| self.start_date + Duration::days(offset as i64))
    }
}
