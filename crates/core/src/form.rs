//! The registration form state and its sub-records.
//!
//! [`FormState`] serialises with the camelCase field names the registration form and the
//! offline queue use, so a queued draft round-trips through this type unchanged.

use registration_types::PatientUuid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Address field name (`cityVillage`, `address1`, ...) to value.
pub type AddressFields = BTreeMap<String, String>;

/// Normalised identifier-type name to identifier record.
pub type IdentifierMap = BTreeMap<String, IdentifierRecord>;

/// Attribute-type uuid to value (or referenced concept uuid).
pub type AttributeMap = BTreeMap<String, String>;

/// Observation concept uuid to value (or referenced concept uuid).
pub type ObservationMap = BTreeMap<String, String>;

/// Twelve-hour clock designator for the time of death.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathTimeFormat {
    #[default]
    AM,
    PM,
}

/// Identifier source chosen for auto-generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierSource {
    pub uuid: String,
    pub name: String,
}

/// One identifier slot of the form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentifierRecord {
    /// Uuid of the stored identifier; `None` for identifiers not yet saved locally.
    pub identifier_uuid: Option<String>,
    pub identifier_type_uuid: String,
    pub identifier_name: String,
    pub identifier_value: String,
    /// Value before editing, used by the save pipeline to detect changes.
    pub initial_value: String,
    pub preferred: bool,
    pub required: bool,
    pub selected_source: Option<IdentifierSource>,
    pub auto_generation: bool,
}

/// Pending change to a relationship, set by the form layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationshipAction {
    Add,
    Update,
    Delete,
}

/// A relationship oriented relative to the patient being registered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationshipValue {
    pub uuid: Option<String>,
    pub related_person_name: String,
    pub related_person_uuid: String,
    /// `<relationship-type uuid>/aIsToB` or `<relationship-type uuid>/bIsToA`.
    pub relationship_type: String,
    pub initial_relationship_type_value: Option<String>,
    pub action: Option<RelationshipAction>,
}

/// Canonical registration form state.
///
/// Deserialisation fills absent fields from [`FormState::blank`], so a draft saved from a
/// partially filled form still loads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormState {
    pub patient_uuid: String,
    pub given_name: String,
    pub middle_name: String,
    pub family_name: String,
    pub additional_given_name: String,
    pub additional_middle_name: String,
    pub additional_family_name: String,
    pub add_name_in_local_language: bool,
    pub gender: String,
    pub birthdate: Option<chrono::NaiveDate>,
    pub years_estimated: u32,
    pub months_estimated: u32,
    pub birthdate_estimated: bool,
    pub telephone_number: String,
    pub is_dead: bool,
    pub death_date: Option<chrono::NaiveDate>,
    pub death_time: Option<String>,
    pub death_time_format: DeathTimeFormat,
    pub death_cause: String,
    pub non_coded_cause_of_death: Option<String>,
    pub relationships: Vec<RelationshipValue>,
    pub identifiers: IdentifierMap,
    pub address: AddressFields,
    pub attributes: AttributeMap,
    pub obs: ObservationMap,
}

impl FormState {
    /// The fixed starting state: empty strings, `false`, zero estimates, `AM`, empty maps.
    pub fn blank(patient_uuid: impl Into<String>) -> Self {
        Self {
            patient_uuid: patient_uuid.into(),
            given_name: String::new(),
            middle_name: String::new(),
            family_name: String::new(),
            additional_given_name: String::new(),
            additional_middle_name: String::new(),
            additional_family_name: String::new(),
            add_name_in_local_language: false,
            gender: String::new(),
            birthdate: None,
            years_estimated: 0,
            months_estimated: 0,
            birthdate_estimated: false,
            telephone_number: String::new(),
            is_dead: false,
            death_date: None,
            death_time: None,
            death_time_format: DeathTimeFormat::AM,
            death_cause: String::new(),
            non_coded_cause_of_death: None,
            relationships: Vec::new(),
            identifiers: IdentifierMap::new(),
            address: AddressFields::new(),
            attributes: AttributeMap::new(),
            obs: ObservationMap::new(),
        }
    }

    /// A blank state with a freshly allocated patient uuid, for a new registration.
    pub fn new_registration() -> Self {
        Self::blank(PatientUuid::new().to_string())
    }
}

impl Default for FormState {
    fn default() -> Self {
        Self::blank(String::new())
    }
}

/// Lookup of existing record uuids, used by the save pipeline to update rather than
/// re-create names, addresses and attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientUuidMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_name_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_name_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_address_uuid: Option<String>,
    /// `attribute.<attribute-type uuid>` to the attribute's own uuid.
    #[serde(flatten)]
    pub attribute_uuids: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_state_is_empty() {
        let state = FormState::blank("p-1");
        assert_eq!(state.patient_uuid, "p-1");
        assert!(state.given_name.is_empty());
        assert!(!state.is_dead);
        assert_eq!(state.death_time_format, DeathTimeFormat::AM);
        assert_eq!(state.years_estimated, 0);
        assert!(state.identifiers.is_empty());
        assert!(state.obs.is_empty());
    }

    #[test]
    fn new_registration_allocates_canonical_uuid() {
        let state = FormState::new_registration();
        assert!(PatientUuid::is_canonical(&state.patient_uuid));
    }

    #[test]
    fn serialises_with_form_field_names() {
        let mut state = FormState::blank("p-1");
        state.non_coded_cause_of_death = Some("Fell".into());
        let json = serde_json::to_value(&state).expect("serialise");

        assert_eq!(json["patientUuid"], "p-1");
        assert_eq!(json["deathTimeFormat"], "AM");
        assert_eq!(json["nonCodedCauseOfDeath"], "Fell");
        assert_eq!(json["isDead"], false);
    }

    #[test]
    fn partial_form_values_fill_from_blank() {
        let state: FormState = serde_json::from_str(
            r#"{
                "patientUuid": "p-1",
                "givenName": "Partial",
                "identifiers": {"nationalId": {"identifierValue": "100GEJ"}}
            }"#,
        )
        .expect("partial form values load");

        assert_eq!(state.patient_uuid, "p-1");
        assert_eq!(state.given_name, "Partial");
        assert_eq!(state.death_time_format, DeathTimeFormat::AM);
        assert!(!state.is_dead);
        let identifier = &state.identifiers["nationalId"];
        assert_eq!(identifier.identifier_value, "100GEJ");
        assert!(identifier.identifier_uuid.is_none());
        assert!(!identifier.required);
    }

    #[test]
    fn uuid_map_flattens_attribute_entries() {
        let json = r#"{
            "preferredNameUuid": "n-1",
            "attribute.14d4f066": "a-1"
        }"#;
        let map: PatientUuidMap = serde_json::from_str(json).expect("deserialise");

        assert_eq!(map.preferred_name_uuid.as_deref(), Some("n-1"));
        assert_eq!(
            map.attribute_uuids.get("attribute.14d4f066").map(String::as_str),
            Some("a-1")
        );
    }
}
