//! Vital status from the person resource.

use super::parse_timestamp;
use crate::form::{DeathTimeFormat, FormState};
use crate::resources::PersonDeathInfo;
use chrono::{NaiveDate, Timelike};
use registration_types::ConceptUuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeathFields {
    pub death_date: Option<NaiveDate>,
    /// Twelve-hour `hh:mm`.
    pub death_time: Option<String>,
    pub death_time_format: DeathTimeFormat,
    pub death_cause: String,
    pub non_coded_cause_of_death: Option<String>,
}

impl DeathFields {
    pub fn apply(self, state: &mut FormState) {
        state.is_dead = true;
        state.death_date = self.death_date;
        state.death_time = self.death_time;
        state.death_time_format = self.death_time_format;
        state.death_cause = self.death_cause;
        state.non_coded_cause_of_death = self.non_coded_cause_of_death;
    }
}

/// Death fields for a deceased person; `None` when the person is not marked dead.
///
/// A non-empty free-text cause wins over a coded one: the form shows it under the configured
/// free-text concept.
pub fn death_fields_from_info(
    info: &PersonDeathInfo,
    free_text_concept: &ConceptUuid,
) -> Option<DeathFields> {
    if !info.dead {
        return None;
    }

    let death_datetime = info.death_date.as_deref().and_then(parse_timestamp);
    let death_time = death_datetime.map(|dt| dt.format("%I:%M").to_string());
    let death_time_format = match death_datetime {
        Some(dt) if dt.hour() >= 12 => DeathTimeFormat::PM,
        _ => DeathTimeFormat::AM,
    };

    let non_coded = info
        .cause_of_death_non_coded
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let (death_cause, non_coded_cause_of_death) = match non_coded {
        Some(text) => (free_text_concept.to_string(), Some(text.to_string())),
        None => (
            info.cause_of_death
                .as_ref()
                .map(|c| c.uuid.clone())
                .unwrap_or_default(),
            None,
        ),
    };

    Some(DeathFields {
        death_date: death_datetime.map(|dt| dt.date()),
        death_time,
        death_time_format,
        death_cause,
        non_coded_cause_of_death,
    })
}
