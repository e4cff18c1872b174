//! Wire models for the REST resources registration reads.
//!
//! These mirror the custom representations requested from the patient-record REST API
//! (`person`, `person/{uuid}/attribute`, `patient/{uuid}/identifier`, `relationship`,
//! `encounter`, `patientidentifiertype`). Unknown keys are ignored.

use serde::Deserialize;

/// Paged result list (`{"results": [...]}`).
#[derive(Clone, Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Reference to a concept or other metadata item.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ConceptRef {
    pub uuid: String,
    #[serde(default)]
    pub display: Option<String>,
}

/// Value carried by an attribute or observation.
///
/// Coded values arrive as a reference object; everything else is a scalar.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ResourceValue {
    Reference(ConceptRef),
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl ResourceValue {
    /// The form representation: referenced uuid for coded values, text otherwise.
    pub fn into_form_value(self) -> String {
        match self {
            ResourceValue::Reference(r) => r.uuid,
            ResourceValue::Text(s) => s,
            ResourceValue::Number(n) => n.to_string(),
            ResourceValue::Flag(b) => b.to_string(),
        }
    }
}

/// Person resource restricted to death information.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDeathInfo {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub dead: bool,
    pub death_date: Option<String>,
    pub cause_of_death: Option<ConceptRef>,
    pub cause_of_death_non_coded: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AttributeType {
    pub uuid: String,
    #[serde(default)]
    pub display: Option<String>,
    /// Java class name of the attribute datatype (`org.openmrs.Concept`, `java.lang.String`).
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonAttribute {
    pub uuid: String,
    #[serde(default)]
    pub display: Option<String>,
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub value: Option<ResourceValue>,
}

/// Local identifier type.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierType {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientIdentifier {
    pub uuid: String,
    pub identifier: String,
    pub identifier_type: IdentifierType,
    #[serde(default)]
    pub preferred: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PersonRef {
    pub uuid: String,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub uuid: String,
    pub person_a: PersonRef,
    pub person_b: PersonRef,
    pub relationship_type: ConceptRef,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Observation {
    pub concept: ConceptRef,
    #[serde(default)]
    pub value: Option<ResourceValue>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub encounter_type: Option<ConceptRef>,
    #[serde(default)]
    pub encounter_datetime: Option<String>,
    #[serde(default)]
    pub obs: Vec<Observation>,
}
