//! Constants used throughout the registration core crate.
//!
//! Path and filename constants for the file-backed sources, and the defaults used when no
//! configuration file is supplied.

/// Default directory for registration data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "registration_data";

/// Directory holding sharded per-patient resource folders.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Directory holding master-index records, one `<source-id>.json` per record.
pub const MASTER_INDEX_DIR_NAME: &str = "master-index";

/// FHIR patient resource inside a patient folder.
pub const PATIENT_JSON_FILENAME: &str = "patient.json";

/// Person resource carrying death information.
pub const PERSON_JSON_FILENAME: &str = "person.json";

/// Paged person attributes.
pub const ATTRIBUTES_JSON_FILENAME: &str = "attributes.json";

/// Paged patient identifiers.
pub const IDENTIFIERS_JSON_FILENAME: &str = "identifiers.json";

/// Paged relationships.
pub const RELATIONSHIPS_JSON_FILENAME: &str = "relationships.json";

/// Paged encounters.
pub const ENCOUNTERS_JSON_FILENAME: &str = "encounters.json";

/// Identifier-type catalogue at the data root.
pub const IDENTIFIER_TYPES_JSON_FILENAME: &str = "identifier-types.json";

/// Offline synchronisation queue at the data root.
pub const OFFLINE_QUEUE_JSON_FILENAME: &str = "offline-queue.json";

/// CIEL concept "Other non-coded", used as the free-text cause of death.
pub const DEFAULT_FREE_TEXT_CONCEPT_UUID: &str = "5622AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Prefix for attribute entries in the patient uuid map.
pub const ATTRIBUTE_UUID_KEY_PREFIX: &str = "attribute.";
