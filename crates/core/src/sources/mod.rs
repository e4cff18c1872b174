//! Data sources consumed by the reconciler.
//!
//! Each trait is the contract of one external collaborator. Transport concerns (retries,
//! caching, timeouts) belong to the implementations, not to the reconciler.

pub mod files;
pub mod memory;

use crate::error::SourceResult;
use crate::offline::QueuedRegistration;
use crate::resources::{
    Encounter, IdentifierType, PatientIdentifier, PersonAttribute, PersonDeathInfo, Relationship,
};
use async_trait::async_trait;
use fhir::PatientRecord;
use registration_types::PatientUuid;

pub use files::FileSources;
pub use memory::InMemorySources;

/// The local patient-record system.
#[async_trait]
pub trait PatientRecordSource: Send + Sync {
    /// Core record; `Ok(None)` when no such patient is stored.
    async fn patient(&self, patient_uuid: &PatientUuid) -> SourceResult<Option<PatientRecord>>;

    async fn death_info(&self, person_uuid: &PatientUuid) -> SourceResult<PersonDeathInfo>;

    async fn attributes(&self, person_uuid: &PatientUuid) -> SourceResult<Vec<PersonAttribute>>;

    async fn identifiers(
        &self,
        patient_uuid: &PatientUuid,
    ) -> SourceResult<Vec<PatientIdentifier>>;

    async fn relationships(&self, patient_uuid: &PatientUuid) -> SourceResult<Vec<Relationship>>;

    /// Encounters of one encounter type for the patient, in any order.
    async fn encounters(
        &self,
        patient_uuid: &PatientUuid,
        encounter_type_uuid: &str,
    ) -> SourceResult<Vec<Encounter>>;

    /// Identifier type metadata; `Ok(None)` when the type does not exist.
    async fn identifier_type(&self, identifier_type_uuid: &str)
        -> SourceResult<Option<IdentifierType>>;
}

/// The offline synchronisation queue of not-yet-synchronised registrations.
#[async_trait]
pub trait OfflineQueue: Send + Sync {
    async fn queued_registrations(&self) -> SourceResult<Vec<QueuedRegistration>>;
}

/// The external master patient index.
#[async_trait]
pub trait MasterIndexSource: Send + Sync {
    /// Record for an external source identifier; `Ok(None)` when unknown.
    async fn patient(&self, source_id: &str) -> SourceResult<Option<PatientRecord>>;
}
