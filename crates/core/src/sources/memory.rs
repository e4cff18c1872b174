//! In-memory sources with per-source latency and failure injection.
//!
//! Useful for wiring the reconciler without a backend and for exercising arrival-order
//! behaviour: a configured delay holds a fetch back, a configured failure replaces its
//! result.

use super::{MasterIndexSource, OfflineQueue, PatientRecordSource};
use crate::error::{SourceError, SourceResult};
use crate::offline::QueuedRegistration;
use crate::patch::SourceKind;
use crate::resources::{
    Encounter, IdentifierType, PatientIdentifier, PersonAttribute, PersonDeathInfo, Relationship,
};
use async_trait::async_trait;
use fhir::PatientRecord;
use registration_types::PatientUuid;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct InMemorySources {
    patients: HashMap<String, PatientRecord>,
    death_info: HashMap<String, PersonDeathInfo>,
    attributes: HashMap<String, Vec<PersonAttribute>>,
    identifiers: HashMap<String, Vec<PatientIdentifier>>,
    relationships: HashMap<String, Vec<Relationship>>,
    encounters: HashMap<String, Vec<(String, Encounter)>>,
    identifier_types: HashMap<String, IdentifierType>,
    master_index: HashMap<String, PatientRecord>,
    queue: Vec<QueuedRegistration>,
    delays: HashMap<SourceKind, Duration>,
    failures: HashMap<SourceKind, SourceError>,
    queue_reads: AtomicUsize,
}

impl InMemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a core record under its own id.
    pub fn with_patient(mut self, record: PatientRecord) -> Self {
        self.patients.insert(record.id.clone(), record);
        self
    }

    pub fn with_death_info(mut self, patient_uuid: &str, info: PersonDeathInfo) -> Self {
        self.death_info.insert(patient_uuid.to_string(), info);
        self
    }

    pub fn with_attributes(mut self, patient_uuid: &str, attributes: Vec<PersonAttribute>) -> Self {
        self.attributes.insert(patient_uuid.to_string(), attributes);
        self
    }

    pub fn with_identifiers(
        mut self,
        patient_uuid: &str,
        identifiers: Vec<PatientIdentifier>,
    ) -> Self {
        self.identifiers.insert(patient_uuid.to_string(), identifiers);
        self
    }

    pub fn with_relationships(
        mut self,
        patient_uuid: &str,
        relationships: Vec<Relationship>,
    ) -> Self {
        self.relationships
            .insert(patient_uuid.to_string(), relationships);
        self
    }

    pub fn with_encounter(
        mut self,
        patient_uuid: &str,
        encounter_type_uuid: &str,
        encounter: Encounter,
    ) -> Self {
        self.encounters
            .entry(patient_uuid.to_string())
            .or_default()
            .push((encounter_type_uuid.to_string(), encounter));
        self
    }

    pub fn with_identifier_type(mut self, identifier_type: IdentifierType) -> Self {
        self.identifier_types
            .insert(identifier_type.uuid.clone(), identifier_type);
        self
    }

    pub fn with_master_index_record(mut self, source_id: &str, record: PatientRecord) -> Self {
        self.master_index.insert(source_id.to_string(), record);
        self
    }

    pub fn with_queued_registration(mut self, registration: QueuedRegistration) -> Self {
        self.queue.push(registration);
        self
    }

    /// Hold every fetch of `source` back by `delay`.
    pub fn with_delay(mut self, source: SourceKind, delay: Duration) -> Self {
        self.delays.insert(source, delay);
        self
    }

    /// Make every fetch of `source` fail with `error`.
    pub fn with_failure(mut self, source: SourceKind, error: SourceError) -> Self {
        self.failures.insert(source, error);
        self
    }

    /// Number of times the offline queue has been read.
    pub fn queue_reads(&self) -> usize {
        self.queue_reads.load(Ordering::SeqCst)
    }

    async fn fetch<T>(
        &self,
        source: SourceKind,
        resource: &'static str,
        id: &str,
        value: Option<T>,
    ) -> SourceResult<T> {
        if let Some(delay) = self.delays.get(&source) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(error) = self.failures.get(&source) {
            return Err(error.clone());
        }
        value.ok_or_else(|| SourceError::NotFound {
            resource,
            id: id.to_string(),
        })
    }
}

#[async_trait]
impl PatientRecordSource for InMemorySources {
    async fn patient(&self, patient_uuid: &PatientUuid) -> SourceResult<Option<PatientRecord>> {
        let id = patient_uuid.to_string();
        let record = self.patients.get(&id).cloned();
        self.fetch(SourceKind::CoreRecord, "patient", &id, Some(record))
            .await
    }

    async fn death_info(&self, person_uuid: &PatientUuid) -> SourceResult<PersonDeathInfo> {
        let id = person_uuid.to_string();
        let info = self.death_info.get(&id).cloned();
        self.fetch(SourceKind::DeathInfo, "person", &id, info).await
    }

    async fn attributes(&self, person_uuid: &PatientUuid) -> SourceResult<Vec<PersonAttribute>> {
        let id = person_uuid.to_string();
        let attributes = self.attributes.get(&id).cloned();
        self.fetch(SourceKind::Attributes, "person attributes", &id, attributes)
            .await
    }

    async fn identifiers(
        &self,
        patient_uuid: &PatientUuid,
    ) -> SourceResult<Vec<PatientIdentifier>> {
        let id = patient_uuid.to_string();
        let identifiers = self.identifiers.get(&id).cloned();
        self.fetch(SourceKind::Identifiers, "patient identifiers", &id, identifiers)
            .await
    }

    async fn relationships(&self, patient_uuid: &PatientUuid) -> SourceResult<Vec<Relationship>> {
        let id = patient_uuid.to_string();
        let relationships = self.relationships.get(&id).cloned();
        self.fetch(SourceKind::Relationships, "relationships", &id, relationships)
            .await
    }

    async fn encounters(
        &self,
        patient_uuid: &PatientUuid,
        encounter_type_uuid: &str,
    ) -> SourceResult<Vec<Encounter>> {
        let id = patient_uuid.to_string();
        let encounters = self
            .encounters
            .get(&id)
            .map(|all| {
                all.iter()
                    .filter(|(type_uuid, _)| type_uuid == encounter_type_uuid)
                    .map(|(_, encounter)| encounter.clone())
                    .collect()
            })
            .unwrap_or_default();
        self.fetch(SourceKind::Encounters, "encounters", &id, Some(encounters))
            .await
    }

    async fn identifier_type(
        &self,
        identifier_type_uuid: &str,
    ) -> SourceResult<Option<IdentifierType>> {
        Ok(self.identifier_types.get(identifier_type_uuid).cloned())
    }
}

#[async_trait]
impl OfflineQueue for InMemorySources {
    async fn queued_registrations(&self) -> SourceResult<Vec<QueuedRegistration>> {
        self.queue_reads.fetch_add(1, Ordering::SeqCst);
        self.fetch(
            SourceKind::OfflineDraft,
            "offline queue",
            "",
            Some(self.queue.clone()),
        )
        .await
    }
}

#[async_trait]
impl MasterIndexSource for InMemorySources {
    async fn patient(&self, source_id: &str) -> SourceResult<Option<PatientRecord>> {
        let record = self.master_index.get(source_id).cloned();
        self.fetch(
            SourceKind::MasterIndex,
            "master index record",
            source_id,
            Some(record),
        )
        .await
    }
}
