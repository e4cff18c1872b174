//! Registration runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the reconciler as an
//! `Arc`. Nothing in the core reads environment variables while reconciling.
//!
//! The on-disk form is YAML:
//!
//! ```yaml
//! freeTextFieldConceptUuid: 5622AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA
//! phoneNumberAttributeTypeUuid: 14d4f066-15f5-102d-96e4-000c29c2a5d7
//! registrationEncounterTypeUuid: de1f9d67-b73e-4e1b-90d0-036166fc6995
//! identifierMappings:
//!   - externalSystem: urn:mpi:national-id
//!     identifierTypeUuid: 05a29f94-c0ed-11e2-94be-8c13b969e334
//! ```

use crate::constants::DEFAULT_FREE_TEXT_CONCEPT_UUID;
use crate::{RegistrationError, RegistrationResult};
use registration_types::ConceptUuid;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Maps a master-index identifier system onto a local identifier type.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierMapping {
    pub external_system: String,
    pub identifier_type_uuid: ConceptUuid,
}

/// Registration configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct RegistrationConfig {
    free_text_field_concept_uuid: ConceptUuid,
    phone_number_attribute_type_uuid: Option<ConceptUuid>,
    registration_encounter_type_uuid: Option<ConceptUuid>,
    identifier_mappings: Vec<IdentifierMapping>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RegistrationConfigFile {
    free_text_field_concept_uuid: Option<ConceptUuid>,
    phone_number_attribute_type_uuid: Option<ConceptUuid>,
    registration_encounter_type_uuid: Option<ConceptUuid>,
    #[serde(default)]
    identifier_mappings: Vec<IdentifierMapping>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            free_text_field_concept_uuid: default_free_text_concept(),
            phone_number_attribute_type_uuid: None,
            registration_encounter_type_uuid: None,
            identifier_mappings: Vec::new(),
        }
    }
}

fn default_free_text_concept() -> ConceptUuid {
    ConceptUuid::new(DEFAULT_FREE_TEXT_CONCEPT_UUID)
        .expect("default free-text concept uuid is non-empty")
}

impl RegistrationConfig {
    /// Create a new `RegistrationConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidInput`] if two mappings share an external system
    /// (the mapping would be ambiguous) or an external system is blank.
    pub fn new(
        free_text_field_concept_uuid: ConceptUuid,
        phone_number_attribute_type_uuid: Option<ConceptUuid>,
        registration_encounter_type_uuid: Option<ConceptUuid>,
        identifier_mappings: Vec<IdentifierMapping>,
    ) -> RegistrationResult<Self> {
        let mut seen = HashSet::new();
        for mapping in &identifier_mappings {
            let system = mapping.external_system.trim();
            if system.is_empty() {
                return Err(RegistrationError::InvalidInput(
                    "identifier mapping externalSystem cannot be empty".into(),
                ));
            }
            if !seen.insert(system.to_string()) {
                return Err(RegistrationError::InvalidInput(format!(
                    "duplicate identifier mapping for external system '{system}'"
                )));
            }
        }

        Ok(Self {
            free_text_field_concept_uuid,
            phone_number_attribute_type_uuid,
            registration_encounter_type_uuid,
            identifier_mappings,
        })
    }

    /// Parse configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::ConfigDeserialization`] for malformed YAML or unknown keys,
    /// and the validation errors of [`RegistrationConfig::new`].
    pub fn from_yaml_str(yaml_text: &str) -> RegistrationResult<Self> {
        let file: RegistrationConfigFile =
            serde_yaml::from_str(yaml_text).map_err(RegistrationError::ConfigDeserialization)?;

        Self::new(
            file.free_text_field_concept_uuid
                .unwrap_or_else(default_free_text_concept),
            file.phone_number_attribute_type_uuid,
            file.registration_encounter_type_uuid,
            file.identifier_mappings,
        )
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::ConfigRead`] if the file cannot be read, otherwise the
    /// errors of [`RegistrationConfig::from_yaml_str`].
    pub fn load(path: &Path) -> RegistrationResult<Self> {
        let text = std::fs::read_to_string(path).map_err(RegistrationError::ConfigRead)?;
        Self::from_yaml_str(&text)
    }

    /// Load from `path` when given and present, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> RegistrationResult<Self> {
        match path {
            Some(p) if p.is_file() => Self::load(p),
            Some(p) => {
                tracing::warn!(
                    "configuration file {} not found, using defaults",
                    p.display()
                );
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn free_text_field_concept_uuid(&self) -> &ConceptUuid {
        &self.free_text_field_concept_uuid
    }

    pub fn phone_number_attribute_type_uuid(&self) -> Option<&ConceptUuid> {
        self.phone_number_attribute_type_uuid.as_ref()
    }

    pub fn registration_encounter_type_uuid(&self) -> Option<&ConceptUuid> {
        self.registration_encounter_type_uuid.as_ref()
    }

    pub fn identifier_mappings(&self) -> &[IdentifierMapping] {
        &self.identifier_mappings
    }

    /// Local identifier type configured for an external identifier system.
    pub fn identifier_type_for_system(&self, external_system: &str) -> Option<&ConceptUuid> {
        self.identifier_mappings
            .iter()
            .find(|m| m.external_system.trim() == external_system.trim())
            .map(|m| &m.identifier_type_uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_yaml() {
        let yaml = r#"
freeTextFieldConceptUuid: 5622AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA
phoneNumberAttributeTypeUuid: 14d4f066-15f5-102d-96e4-000c29c2a5d7
registrationEncounterTypeUuid: de1f9d67-b73e-4e1b-90d0-036166fc6995
identifierMappings:
  - externalSystem: urn:mpi:national-id
    identifierTypeUuid: 05a29f94-c0ed-11e2-94be-8c13b969e334
"#;
        let cfg = RegistrationConfig::from_yaml_str(yaml).expect("valid config");

        assert_eq!(
            cfg.phone_number_attribute_type_uuid().map(ConceptUuid::as_str),
            Some("14d4f066-15f5-102d-96e4-000c29c2a5d7")
        );
        assert_eq!(
            cfg.identifier_type_for_system("urn:mpi:national-id")
                .map(ConceptUuid::as_str),
            Some("05a29f94-c0ed-11e2-94be-8c13b969e334")
        );
        assert!(cfg.identifier_type_for_system("urn:other").is_none());
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let cfg = RegistrationConfig::from_yaml_str("{}").expect("defaults");
        assert_eq!(
            cfg.free_text_field_concept_uuid().as_str(),
            DEFAULT_FREE_TEXT_CONCEPT_UUID
        );
        assert!(cfg.registration_encounter_type_uuid().is_none());
        assert!(cfg.identifier_mappings().is_empty());
    }

    #[test]
    fn rejects_duplicate_external_systems() {
        let yaml = r#"
identifierMappings:
  - externalSystem: urn:a
    identifierTypeUuid: t1
  - externalSystem: urn:a
    identifierTypeUuid: t2
"#;
        let err = RegistrationConfig::from_yaml_str(yaml).expect_err("duplicate system");
        match err {
            RegistrationError::InvalidInput(msg) => assert!(msg.contains("urn:a")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_keys_and_blank_concepts() {
        assert!(matches!(
            RegistrationConfig::from_yaml_str("unexpected: 1"),
            Err(RegistrationError::ConfigDeserialization(_))
        ));
        assert!(matches!(
            RegistrationConfig::from_yaml_str("freeTextFieldConceptUuid: '  '"),
            Err(RegistrationError::ConfigDeserialization(_))
        ));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let missing = dir.path().join("absent.yaml");
        let cfg = RegistrationConfig::load_or_default(Some(&missing)).expect("defaults");
        assert!(cfg.identifier_mappings().is_empty());

        let present = dir.path().join("registration.yaml");
        std::fs::write(
            &present,
            "registrationEncounterTypeUuid: de1f9d67-b73e-4e1b-90d0-036166fc6995\n",
        )
        .expect("write config");
        let cfg = RegistrationConfig::load_or_default(Some(&present)).expect("load");
        assert!(cfg.registration_encounter_type_uuid().is_some());
    }
}
