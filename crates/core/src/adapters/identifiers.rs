//! Identifier records keyed by normalised identifier-type name.

use crate::config::RegistrationConfig;
use crate::form::{IdentifierMap, IdentifierRecord};
use crate::resources::{IdentifierType, PatientIdentifier};
use std::collections::HashMap;

/// Form key for an identifier type: lowercase with all whitespace removed.
///
/// `"National ID"`, `"National Id"` and `"national  id"` all map to `nationalid`.
pub fn normalise_identifier_key(identifier_type_name: &str) -> String {
    identifier_type_name
        .split_whitespace()
        .collect::<String>()
        .to_lowercase()
}

/// Identifier map for a locally stored patient.
///
/// Later entries of the same type replace earlier ones.
pub fn identifiers_from_resources(identifiers: Vec<PatientIdentifier>) -> IdentifierMap {
    identifiers
        .into_iter()
        .map(|identifier| {
            let key = normalise_identifier_key(&identifier.identifier_type.name);
            let record = IdentifierRecord {
                identifier_uuid: Some(identifier.uuid),
                identifier_type_uuid: identifier.identifier_type.uuid,
                identifier_name: identifier.identifier_type.name,
                identifier_value: identifier.identifier.clone(),
                initial_value: identifier.identifier,
                preferred: identifier.preferred,
                required: identifier.identifier_type.required,
                selected_source: None,
                auto_generation: false,
            };
            (key, record)
        })
        .collect()
}

/// Identifier map for a master-index record.
///
/// `identifier_types` holds the local identifier types already resolved for the configured
/// mappings. Identifiers whose system has no mapping, whose mapped type was not resolved, or
/// which carry no value are dropped.
pub fn identifiers_from_master_index(
    identifiers: &[fhir::Identifier],
    config: &RegistrationConfig,
    identifier_types: &HashMap<String, IdentifierType>,
) -> IdentifierMap {
    let mut map = IdentifierMap::new();
    for identifier in identifiers {
        let (Some(system), Some(value)) = (&identifier.system, &identifier.value) else {
            continue;
        };
        let Some(type_uuid) = config.identifier_type_for_system(system) else {
            tracing::debug!("no identifier mapping for system {system}, dropping identifier");
            continue;
        };
        let Some(identifier_type) = identifier_types.get(type_uuid.as_str()) else {
            tracing::debug!("identifier type {type_uuid} not found, dropping identifier");
            continue;
        };

        map.insert(
            normalise_identifier_key(&identifier_type.name),
            IdentifierRecord {
                identifier_uuid: None,
                identifier_type_uuid: identifier_type.uuid.clone(),
                identifier_name: identifier_type.name.clone(),
                identifier_value: value.clone(),
                initial_value: value.clone(),
                preferred: identifier_type.is_primary,
                required: identifier_type.required,
                selected_source: None,
                auto_generation: false,
            },
        );
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdentifierMapping;
    use registration_types::ConceptUuid;

    fn identifier_type(uuid: &str, name: &str) -> IdentifierType {
        IdentifierType {
            uuid: uuid.into(),
            name: name.into(),
            required: true,
            is_primary: true,
        }
    }

    #[test]
    fn normalisation_ignores_case_and_whitespace() {
        assert_eq!(normalise_identifier_key("National ID"), "nationalid");
        assert_eq!(
            normalise_identifier_key("National ID"),
            normalise_identifier_key("National Id")
        );
        assert_eq!(normalise_identifier_key("  OpenMRS\tID "), "openmrsid");
    }

    #[test]
    fn local_identifiers_start_unedited() {
        let map = identifiers_from_resources(vec![PatientIdentifier {
            uuid: "pi-1".into(),
            identifier: "100GEJ".into(),
            identifier_type: identifier_type("t-openmrs", "OpenMRS ID"),
            preferred: true,
        }]);

        let record = map.get("openmrsid").expect("keyed by normalised name");
        assert_eq!(record.identifier_uuid.as_deref(), Some("pi-1"));
        assert_eq!(record.identifier_value, "100GEJ");
        assert_eq!(record.initial_value, record.identifier_value);
        assert_eq!(record.selected_source, None);
        assert!(!record.auto_generation);
        assert!(record.required);
    }

    #[test]
    fn same_normalised_name_collapses_to_one_slot() {
        let map = identifiers_from_resources(vec![
            PatientIdentifier {
                uuid: "pi-1".into(),
                identifier: "A".into(),
                identifier_type: identifier_type("t-1", "National ID"),
                preferred: false,
            },
            PatientIdentifier {
                uuid: "pi-2".into(),
                identifier: "B".into(),
                identifier_type: identifier_type("t-1", "National Id"),
                preferred: false,
            },
        ]);

        assert_eq!(map.len(), 1);
        assert_eq!(map["nationalid"].identifier_value, "B");
    }

    #[test]
    fn master_index_drops_unmapped_identifiers() {
        let config = RegistrationConfig::new(
            ConceptUuid::new("free-text").unwrap(),
            None,
            None,
            vec![IdentifierMapping {
                external_system: "urn:mpi:national-id".into(),
                identifier_type_uuid: ConceptUuid::new("t-national").unwrap(),
            }],
        )
        .unwrap();
        let types = HashMap::from([(
            "t-national".to_string(),
            identifier_type("t-national", "National ID"),
        )]);
        let identifiers = vec![
            fhir::Identifier {
                system: Some("urn:mpi:national-id".into()),
                value: Some("NIN-1".into()),
                ..Default::default()
            },
            fhir::Identifier {
                system: Some("urn:mpi:passport".into()),
                value: Some("P-9".into()),
                ..Default::default()
            },
            fhir::Identifier {
                system: None,
                value: Some("orphan".into()),
                ..Default::default()
            },
        ];

        let map = identifiers_from_master_index(&identifiers, &config, &types);

        assert_eq!(map.len(), 1);
        let record = &map["nationalid"];
        assert_eq!(record.identifier_uuid, None);
        assert_eq!(record.identifier_value, "NIN-1");
        assert_eq!(record.initial_value, "NIN-1");
        assert!(record.preferred);
    }

    #[test]
    fn master_index_drops_identifiers_with_unresolved_type() {
        let config = RegistrationConfig::new(
            ConceptUuid::new("free-text").unwrap(),
            None,
            None,
            vec![IdentifierMapping {
                external_system: "urn:a".into(),
                identifier_type_uuid: ConceptUuid::new("t-missing").unwrap(),
            }],
        )
        .unwrap();
        let identifiers = vec![fhir::Identifier {
            system: Some("urn:a".into()),
            value: Some("1".into()),
            ..Default::default()
        }];

        assert!(identifiers_from_master_index(&identifiers, &config, &HashMap::new()).is_empty());
    }
}
