//! Observations from the most recent registration encounter.

use super::parse_timestamp;
use crate::form::ObservationMap;
use crate::resources::Encounter;
use std::cmp::Reverse;

/// Concept uuid to value for the latest encounter.
///
/// Encounters are ordered by datetime, newest first; encounters with a missing or
/// unparseable datetime sort last. Coded values store the referenced concept's uuid.
pub fn latest_encounter_observations(mut encounters: Vec<Encounter>) -> ObservationMap {
    encounters.sort_by_key(|e| {
        Reverse(
            e.encounter_datetime
                .as_deref()
                .and_then(parse_timestamp),
        )
    });

    let Some(latest) = encounters.into_iter().next() else {
        return ObservationMap::new();
    };

    latest
        .obs
        .into_iter()
        .filter_map(|o| Some((o.concept.uuid, o.value?.into_form_value())))
        .collect()
}
