//! Sources backed by a registration data directory.
//!
//! Layout:
//!
//! ```text
//! <root>/
//!   identifier-types.json        {"results": [IdentifierType, ...]}
//!   offline-queue.json           [QueuedRegistration, ...] (unreadable entries are skipped)
//!   master-index/<source-id>.json   FHIR Patient
//!   patients/<s1>/<s2>/<uuid>/
//!     patient.json               FHIR Patient
//!     person.json                PersonDeathInfo
//!     attributes.json            {"results": [PersonAttribute, ...]}
//!     identifiers.json           {"results": [PatientIdentifier, ...]}
//!     relationships.json         {"results": [Relationship, ...]}
//!     encounters.json            {"results": [Encounter, ...]}
//! ```
//!
//! `s1`/`s2` are the first four hex characters of the patient uuid's simple form.

use super::{MasterIndexSource, OfflineQueue, PatientRecordSource};
use crate::constants::{
    ATTRIBUTES_JSON_FILENAME, ENCOUNTERS_JSON_FILENAME, IDENTIFIERS_JSON_FILENAME,
    IDENTIFIER_TYPES_JSON_FILENAME, MASTER_INDEX_DIR_NAME, OFFLINE_QUEUE_JSON_FILENAME,
    PATIENTS_DIR_NAME, PATIENT_JSON_FILENAME, PERSON_JSON_FILENAME, RELATIONSHIPS_JSON_FILENAME,
};
use crate::error::{SourceError, SourceResult};
use crate::offline::QueuedRegistration;
use crate::resources::{
    Encounter, IdentifierType, Page, PatientIdentifier, PersonAttribute, PersonDeathInfo,
    Relationship,
};
use async_trait::async_trait;
use fhir::{Patient, PatientRecord};
use registration_types::PatientUuid;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct FileSources {
    root: PathBuf,
}

impl FileSources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding every resource of one patient.
    pub fn patient_dir(&self, patient_uuid: &PatientUuid) -> PathBuf {
        patient_uuid.sharded_dir(&self.root.join(PATIENTS_DIR_NAME))
    }

    async fn read_optional(
        &self,
        path: &Path,
        resource: &'static str,
    ) -> SourceResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SourceError::Read {
                resource,
                message: format!("{}: {e}", path.display()),
            }),
        }
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        path: &Path,
        resource: &'static str,
        id: &str,
    ) -> SourceResult<T> {
        let text = self
            .read_optional(path, resource)
            .await?
            .ok_or_else(|| SourceError::NotFound {
                resource,
                id: id.to_string(),
            })?;
        parse_json(&text, resource)
    }

    async fn read_page<T: DeserializeOwned>(
        &self,
        patient_uuid: &PatientUuid,
        filename: &str,
        resource: &'static str,
    ) -> SourceResult<Vec<T>> {
        let path = self.patient_dir(patient_uuid).join(filename);
        let page: Page<T> = self
            .read_json(&path, resource, &patient_uuid.to_string())
            .await?;
        Ok(page.results)
    }

    async fn read_patient(
        &self,
        path: &Path,
        resource: &'static str,
    ) -> SourceResult<Option<PatientRecord>> {
        let Some(text) = self.read_optional(path, resource).await? else {
            return Ok(None);
        };
        Patient::parse(&text)
            .map(Some)
            .map_err(|e| SourceError::Deserialization {
                resource,
                message: e.to_string(),
            })
    }
}

fn parse_json<T: DeserializeOwned>(text: &str, resource: &'static str) -> SourceResult<T> {
    let deserializer = &mut serde_json::Deserializer::from_str(text);
    serde_path_to_error::deserialize(deserializer).map_err(|e| SourceError::Deserialization {
        resource,
        message: e.to_string(),
    })
}

/// Master-index ids become file names, so they must stay a single path component.
fn validate_source_id(source_id: &str) -> SourceResult<()> {
    let trimmed = source_id.trim();
    if trimmed.is_empty()
        || trimmed != source_id
        || source_id.contains(['/', '\\'])
        || source_id.contains("..")
    {
        return Err(SourceError::NotFound {
            resource: "master index record",
            id: source_id.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl PatientRecordSource for FileSources {
    async fn patient(&self, patient_uuid: &PatientUuid) -> SourceResult<Option<PatientRecord>> {
        let path = self.patient_dir(patient_uuid).join(PATIENT_JSON_FILENAME);
        self.read_patient(&path, "patient").await
    }

    async fn death_info(&self, person_uuid: &PatientUuid) -> SourceResult<PersonDeathInfo> {
        let path = self.patient_dir(person_uuid).join(PERSON_JSON_FILENAME);
        self.read_json(&path, "person", &person_uuid.to_string())
            .await
    }

    async fn attributes(&self, person_uuid: &PatientUuid) -> SourceResult<Vec<PersonAttribute>> {
        self.read_page(person_uuid, ATTRIBUTES_JSON_FILENAME, "person attributes")
            .await
    }

    async fn identifiers(
        &self,
        patient_uuid: &PatientUuid,
    ) -> SourceResult<Vec<PatientIdentifier>> {
        self.read_page(patient_uuid, IDENTIFIERS_JSON_FILENAME, "patient identifiers")
            .await
    }

    async fn relationships(&self, patient_uuid: &PatientUuid) -> SourceResult<Vec<Relationship>> {
        self.read_page(patient_uuid, RELATIONSHIPS_JSON_FILENAME, "relationships")
            .await
    }

    async fn encounters(
        &self,
        patient_uuid: &PatientUuid,
        encounter_type_uuid: &str,
    ) -> SourceResult<Vec<Encounter>> {
        let path = self.patient_dir(patient_uuid).join(ENCOUNTERS_JSON_FILENAME);
        let Some(text) = self.read_optional(&path, "encounters").await? else {
            return Ok(Vec::new());
        };
        let page: Page<Encounter> = parse_json(&text, "encounters")?;
        Ok(page
            .results
            .into_iter()
            .filter(|e| {
                e.encounter_type
                    .as_ref()
                    .is_some_and(|t| t.uuid == encounter_type_uuid)
            })
            .collect())
    }

    async fn identifier_type(
        &self,
        identifier_type_uuid: &str,
    ) -> SourceResult<Option<IdentifierType>> {
        let path = self.root.join(IDENTIFIER_TYPES_JSON_FILENAME);
        let Some(text) = self.read_optional(&path, "identifier types").await? else {
            return Ok(None);
        };
        let page: Page<IdentifierType> = parse_json(&text, "identifier types")?;
        Ok(page
            .results
            .into_iter()
            .find(|t| t.uuid == identifier_type_uuid))
    }
}

#[async_trait]
impl OfflineQueue for FileSources {
    async fn queued_registrations(&self) -> SourceResult<Vec<QueuedRegistration>> {
        let path = self.root.join(OFFLINE_QUEUE_JSON_FILENAME);
        let Some(text) = self.read_optional(&path, "offline queue").await? else {
            return Ok(Vec::new());
        };
        let entries: Vec<serde_json::Value> = parse_json(&text, "offline queue")?;
        Ok(entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                serde_path_to_error::deserialize::<_, QueuedRegistration>(entry)
                    .map_err(|e| {
                        tracing::warn!(
                            index,
                            "skipping unreadable offline queue entry at {}: {}",
                            e.path(),
                            e.inner()
                        );
                    })
                    .ok()
            })
            .collect())
    }
}

#[async_trait]
impl MasterIndexSource for FileSources {
    async fn patient(&self, source_id: &str) -> SourceResult<Option<PatientRecord>> {
        validate_source_id(source_id)?;
        let path = self
            .root
            .join(MASTER_INDEX_DIR_NAME)
            .join(format!("{source_id}.json"));
        self.read_patient(&path, "master index record").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PATIENT_JSON: &str = r#"{
        "resourceType": "Patient",
        "id": "8673ee4f-e2ab-4077-ba55-4980f408773e",
        "name": [{"id": "n-1", "family": "Wilson", "given": ["John"]}],
        "gender": "male",
        "birthDate": "1972"
    }"#;

    fn write(path: &Path, text: &str) {
        std::fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
        std::fs::write(path, text).expect("write file");
    }

    fn patient_uuid() -> PatientUuid {
        PatientUuid::parse("8673ee4f-e2ab-4077-ba55-4980f408773e").expect("valid uuid")
    }

    #[tokio::test]
    async fn reads_patient_from_sharded_folder() {
        let dir = TempDir::new().expect("temp dir");
        let sources = FileSources::new(dir.path());
        let id = patient_uuid();
        let patient_dir = sources.patient_dir(&id);
        assert!(patient_dir.ends_with("patients/86/73/8673ee4fe2ab4077ba554980f408773e"));

        write(&patient_dir.join(PATIENT_JSON_FILENAME), PATIENT_JSON);
        let record = PatientRecordSource::patient(&sources, &id)
            .await
            .expect("readable")
            .expect("stored");
        assert_eq!(record.id, id.to_string());
        assert_eq!(record.birth_date.as_deref(), Some("1972"));
    }

    #[tokio::test]
    async fn absent_resources_are_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let sources = FileSources::new(dir.path());
        let id = patient_uuid();

        assert!(PatientRecordSource::patient(&sources, &id)
            .await
            .expect("readable")
            .is_none());
        assert!(matches!(
            sources.relationships(&id).await,
            Err(SourceError::NotFound { .. })
        ));
        assert!(sources
            .queued_registrations()
            .await
            .expect("missing queue is empty")
            .is_empty());
    }

    #[tokio::test]
    async fn malformed_page_reports_path() {
        let dir = TempDir::new().expect("temp dir");
        let sources = FileSources::new(dir.path());
        let id = patient_uuid();
        write(
            &sources.patient_dir(&id).join(ATTRIBUTES_JSON_FILENAME),
            r#"{"results":[{"uuid":"a-1","attributeType":{"uuid":7}}]}"#,
        );

        match sources.attributes(&id).await {
            Err(SourceError::Deserialization { message, .. }) => {
                assert!(message.contains("results[0].attributeType.uuid"), "{message}")
            }
            other => panic!("expected deserialization error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn filters_encounters_by_type() {
        let dir = TempDir::new().expect("temp dir");
        let sources = FileSources::new(dir.path());
        let id = patient_uuid();
        write(
            &sources.patient_dir(&id).join(ENCOUNTERS_JSON_FILENAME),
            r#"{"results":[
                {"uuid":"e-1","encounterType":{"uuid":"reg"},"encounterDatetime":"2025-01-01"},
                {"uuid":"e-2","encounterType":{"uuid":"vitals"}},
                {"uuid":"e-3"}
            ]}"#,
        );

        let encounters = sources.encounters(&id, "reg").await.expect("readable");
        assert_eq!(encounters.len(), 1);
        assert_eq!(encounters[0].uuid.as_deref(), Some("e-1"));
    }

    #[tokio::test]
    async fn master_index_rejects_path_like_ids() {
        let dir = TempDir::new().expect("temp dir");
        let sources = FileSources::new(dir.path());
        write(
            &dir.path().join(MASTER_INDEX_DIR_NAME).join("mpi-42.json"),
            PATIENT_JSON,
        );

        assert!(MasterIndexSource::patient(&sources, "mpi-42")
            .await
            .expect("readable")
            .is_some());
        assert!(MasterIndexSource::patient(&sources, "mpi-0")
            .await
            .expect("readable")
            .is_none());
        assert!(MasterIndexSource::patient(&sources, "../patients")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn offline_queue_skips_unreadable_entries() {
        let dir = TempDir::new().expect("temp dir");
        let sources = FileSources::new(dir.path());
        write(
            &dir.path().join(OFFLINE_QUEUE_JSON_FILENAME),
            r#"[
                {"formValues": {"patientUuid": "p-1", "givenName": 7}},
                {"formValues": {"patientUuid": "p-2", "givenName": "Partial"}},
                "not an entry",
                {"patientUuid": "p-3"}
            ]"#,
        );

        let queue = sources.queued_registrations().await.expect("readable");
        let uuids: Vec<_> = queue
            .iter()
            .map(QueuedRegistration::stored_patient_uuid)
            .collect();
        assert_eq!(uuids, vec![Some("p-2"), Some("p-3")]);
        assert_eq!(
            queue[0].form_values.as_ref().map(|v| v.given_name.as_str()),
            Some("Partial")
        );
    }

    #[tokio::test]
    async fn offline_queue_that_is_not_a_list_is_a_deserialization_error() {
        let dir = TempDir::new().expect("temp dir");
        let sources = FileSources::new(dir.path());
        write(&dir.path().join(OFFLINE_QUEUE_JSON_FILENAME), r#"{"results": []}"#);

        assert!(matches!(
            sources.queued_registrations().await,
            Err(SourceError::Deserialization { .. })
        ));
    }

    #[tokio::test]
    async fn looks_up_identifier_type_in_catalogue() {
        let dir = TempDir::new().expect("temp dir");
        let sources = FileSources::new(dir.path());
        write(
            &dir.path().join(IDENTIFIER_TYPES_JSON_FILENAME),
            r#"{"results":[{"uuid":"t-1","name":"National ID","required":true}]}"#,
        );

        let found = sources.identifier_type("t-1").await.expect("readable");
        assert_eq!(found.map(|t| t.name).as_deref(), Some("National ID"));
        assert!(sources
            .identifier_type("t-2")
            .await
            .expect("readable")
            .is_none());
    }
}
