//! FHIR-aligned patient wire models and translation helpers.
//!
//! Responsibilities:
//! - Define a wire model for the subset of `Patient` that registration consumes
//! - Translate wire data into the public [`PatientRecord`]
//! - Validate `resourceType`
//!
//! Notes:
//! - Records parsed here are read-only inputs; registration never writes FHIR back.

use crate::FhirError;
use serde::Deserialize;

// ============================================================================
// Public domain-level types
// ============================================================================

/// A human name as carried by a patient resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HumanName {
    /// Server-side id of the name element (the person-name uuid on OpenMRS-backed servers).
    pub id: Option<String>,
    pub family: Option<String>,
    pub given: Vec<String>,
}

impl HumanName {
    /// First given name.
    pub fn first_given(&self) -> Option<&str> {
        self.given.first().map(String::as_str)
    }

    /// Second given name, which registration treats as the middle name.
    pub fn middle(&self) -> Option<&str> {
        self.given.get(1).map(String::as_str)
    }
}

/// Contact point (telephone, email, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactPoint {
    pub system: Option<String>,
    pub value: Option<String>,
}

/// Postal address.
///
/// `hierarchy_fields` holds the address-hierarchy extension values keyed by the fragment of
/// the extension URL (`http://fhir.openmrs.org/ext/address#address1` → `address1`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Address {
    pub id: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub hierarchy_fields: Vec<(String, String)>,
}

/// Business identifier assigned to the patient.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identifier {
    /// Identifier namespace; for master-index records this selects the local identifier type.
    pub system: Option<String>,
    pub value: Option<String>,
}

/// Read-only patient record translated from a FHIR `Patient` resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientRecord {
    pub id: String,
    pub names: Vec<HumanName>,
    pub gender: Option<String>,
    /// Stored birth date as received. Precision varies (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`).
    pub birth_date: Option<String>,
    pub telecom: Vec<ContactPoint>,
    pub addresses: Vec<Address>,
    pub identifiers: Vec<Identifier>,
}

impl PatientRecord {
    /// The preferred name (first entry).
    pub fn preferred_name(&self) -> Option<&HumanName> {
        self.names.first()
    }

    /// The additional (local-language) name (second entry).
    pub fn additional_name(&self) -> Option<&HumanName> {
        self.names.get(1)
    }

    /// The primary address (first entry).
    pub fn primary_address(&self) -> Option<&Address> {
        self.addresses.first()
    }

    /// Value of the first contact point, if it carries one.
    pub fn primary_telecom_value(&self) -> Option<&str> {
        self.telecom.first().and_then(|t| t.value.as_deref())
    }
}

// ============================================================================
// Public Patient operations
// ============================================================================

/// Patient resource operations.
///
/// Zero-sized namespace; all methods are associated functions.
pub struct Patient;

impl Patient {
    /// Parse a patient resource from JSON text.
    ///
    /// Uses `serde_path_to_error` so that a schema mismatch reports the failing path
    /// (for example `name.0.given`).
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the JSON does not match the wire schema,
    /// - `resourceType` is not `"Patient"`,
    /// - `id` is missing or empty.
    pub fn parse(json_text: &str) -> Result<PatientRecord, FhirError> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        let wire = match serde_path_to_error::deserialize::<_, PatientWire>(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Translation(format!(
                    "Patient schema mismatch at {path}: {source}"
                )));
            }
        };

        Self::from_wire(wire)
    }

    fn from_wire(wire: PatientWire) -> Result<PatientRecord, FhirError> {
        if wire.resource_type != "Patient" {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Patient', got '{}'",
                wire.resource_type
            )));
        }
        if wire.id.trim().is_empty() {
            return Err(FhirError::InvalidInput("Patient id is empty".into()));
        }
        Ok(wire_to_domain(wire))
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatientWire {
    resource_type: String,

    #[serde(default)]
    id: String,

    #[serde(default)]
    name: Vec<HumanNameWire>,

    gender: Option<String>,

    birth_date: Option<String>,

    #[serde(default)]
    telecom: Vec<ContactPointWire>,

    #[serde(default)]
    address: Vec<AddressWire>,

    #[serde(default)]
    identifier: Vec<IdentifierWire>,
}

#[derive(Clone, Debug, Deserialize)]
struct HumanNameWire {
    id: Option<String>,
    family: Option<String>,
    #[serde(default)]
    given: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct ContactPointWire {
    system: Option<String>,
    value: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressWire {
    id: Option<String>,
    city: Option<String>,
    district: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    #[serde(default)]
    extension: Vec<ExtensionWire>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtensionWire {
    #[serde(default)]
    url: String,
    value_string: Option<String>,
    #[serde(default)]
    extension: Vec<ExtensionWire>,
}

#[derive(Clone, Debug, Deserialize)]
struct IdentifierWire {
    system: Option<String>,
    value: Option<String>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: PatientWire) -> PatientRecord {
    let names = wire
        .name
        .into_iter()
        .map(|n| HumanName {
            id: n.id,
            family: n.family,
            given: n.given,
        })
        .collect();

    let telecom = wire
        .telecom
        .into_iter()
        .map(|t| ContactPoint {
            system: t.system,
            value: t.value,
        })
        .collect();

    let addresses = wire
        .address
        .into_iter()
        .map(|a| {
            let mut hierarchy_fields = Vec::new();
            for outer in &a.extension {
                collect_hierarchy_fields(outer, &mut hierarchy_fields);
            }
            Address {
                id: a.id,
                city: a.city,
                district: a.district,
                state: a.state,
                postal_code: a.postal_code,
                country: a.country,
                hierarchy_fields,
            }
        })
        .collect();

    let identifiers = wire
        .identifier
        .into_iter()
        .map(|i| Identifier {
            system: i.system,
            value: i.value,
        })
        .collect();

    PatientRecord {
        id: wire.id,
        names,
        gender: wire.gender,
        birth_date: wire.birth_date,
        telecom,
        addresses,
        identifiers,
    }
}

/// Address-hierarchy values sit one level down: `extension[].extension[]`, each with a
/// `#field` URL fragment. Leaf extensions without a fragment are skipped.
fn collect_hierarchy_fields(ext: &ExtensionWire, out: &mut Vec<(String, String)>) {
    if ext.extension.is_empty() {
        if let (Some((_, field)), Some(value)) = (ext.url.split_once('#'), &ext.value_string) {
            if !field.is_empty() {
                out.push((field.to_string(), value.clone()));
            }
        }
        return;
    }
    for inner in &ext.extension {
        collect_hierarchy_fields(inner, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  "resourceType": "Patient",
  "id": "8673ee4f-e2ab-4077-ba55-4980f408773e",
  "meta": { "lastUpdated": "2026-01-23T13:58:04.099304Z" },
  "identifier": [
    {
      "id": "1f0ad7a1-430f-4397-b571-59ea654a52db",
      "system": "urn:national-id",
      "value": "100GEJ",
      "type": { "text": "National ID" }
    }
  ],
  "name": [
    { "id": "efdb246f-4142-4c12-a27a-9be60b9592e9", "use": "official", "family": "Wilson", "given": ["John", "Peter"] },
    { "id": "a3c0ab6f-6c84-4c4b-9df8-3c2a5f0c0f36", "family": "Ouilsonne", "given": ["Jean"] }
  ],
  "gender": "male",
  "birthDate": "1972",
  "telecom": [ { "system": "phone", "value": "0785434125" } ],
  "address": [
    {
      "id": "0c244eae-85c8-4cc9-b168-96b51f864e77",
      "city": "Kampala",
      "country": "Uganda",
      "postalCode": "256",
      "extension": [
        {
          "url": "http://fhir.openmrs.org/ext/address",
          "extension": [
            { "url": "http://fhir.openmrs.org/ext/address#address1", "valueString": "Plot 12" }
          ]
        }
      ]
    }
  ]
}"#;

    #[test]
    fn parses_full_patient_resource() {
        let record = Patient::parse(SAMPLE).expect("parse patient");

        assert_eq!(record.id, "8673ee4f-e2ab-4077-ba55-4980f408773e");
        let preferred = record.preferred_name().expect("preferred name");
        assert_eq!(preferred.first_given(), Some("John"));
        assert_eq!(preferred.middle(), Some("Peter"));
        assert_eq!(
            record.additional_name().and_then(|n| n.family.as_deref()),
            Some("Ouilsonne")
        );
        assert_eq!(record.gender.as_deref(), Some("male"));
        assert_eq!(record.birth_date.as_deref(), Some("1972"));
        assert_eq!(record.primary_telecom_value(), Some("0785434125"));
        assert_eq!(
            record.identifiers[0].system.as_deref(),
            Some("urn:national-id")
        );
        assert_eq!(record.identifiers[0].value.as_deref(), Some("100GEJ"));
    }

    #[test]
    fn collects_address_hierarchy_extension_fields() {
        let record = Patient::parse(SAMPLE).expect("parse patient");
        let address = record.primary_address().expect("address");

        assert_eq!(address.city.as_deref(), Some("Kampala"));
        assert_eq!(
            address.hierarchy_fields,
            vec![("address1".to_string(), "Plot 12".to_string())]
        );
    }

    #[test]
    fn ignores_unknown_keys() {
        let input = r#"{"resourceType":"Patient","id":"abc","text":{"status":"generated"},"active":true}"#;
        let record = Patient::parse(input).expect("unknown keys are tolerated");
        assert_eq!(record.id, "abc");
        assert!(record.names.is_empty());
    }

    #[test]
    fn rejects_wrong_types_with_path() {
        let input = r#"{"resourceType":"Patient","id":"abc","name":[{"given":"John"}]}"#;

        let err = Patient::parse(input).expect_err("given must be an array");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("given"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_resource_type() {
        let input = r#"{"resourceType":"Practitioner","id":"abc"}"#;

        let err = Patient::parse(input).expect_err("should reject resourceType");
        match err {
            FhirError::InvalidInput(msg) => {
                assert!(msg.contains("Patient"));
                assert!(msg.contains("Practitioner"));
            }
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_id() {
        let err = Patient::parse(r#"{"resourceType":"Patient"}"#).expect_err("id required");
        assert!(matches!(err, FhirError::InvalidInput(_)));
    }
}
