//! Assembly of the registration form state from independent sources.
//!
//! Every entry point returns a [`LiveState`] handle immediately. Fetches run as source tasks
//! on the handle and report into its coordinator as they resolve, so callers can render the
//! latest snapshot while data is still arriving, or await [`LiveState::settled`] for the
//! fully reconciled state.
//!
//! Local edit fans out into one task per source:
//!
//! ```text
//! core record ──▶ demographics ──┬─▶ offline draft (only when no record was found)
//!                                └─▶ encounter observations (only when a record was found)
//! death info, relationships, identifiers, attributes ──▶ merged as each resolves
//! ```

use crate::adapters::attributes::{attribute_uuid_map, attributes_to_form_values};
use crate::adapters::death::death_fields_from_info;
use crate::adapters::demographics::{
    demographics_from_record, phone_attribute_from_record, uuid_map_from_record,
};
use crate::adapters::encounters::latest_encounter_observations;
use crate::adapters::identifiers::{identifiers_from_master_index, identifiers_from_resources};
use crate::adapters::relationships::relationships_for_patient;
use crate::config::RegistrationConfig;
use crate::error::SourceError;
use crate::form::{AddressFields, FormState, PatientUuidMap};
use crate::live::{LiveState, Observer, PatchSender};
use crate::offline::{find_queued_registration, QueuedRegistration};
use crate::patch::{AddressPatch, FormPatch, MasterIndexImport, Patch, SourceKind, UuidMapPatch};
use crate::resources::IdentifierType;
use crate::sources::{MasterIndexSource, OfflineQueue, PatientRecordSource};
use chrono::NaiveDate;
use fhir::PatientRecord;
use futures::future::join_all;
use registration_types::{ConceptUuid, PatientUuid};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::watch;

/// Live registration form state.
pub type FormHandle = LiveState<FormState, FormPatch>;

/// Live patient uuid map.
pub type UuidMapHandle = LiveState<PatientUuidMap, UuidMapPatch>;

/// Live initial address field values.
pub type AddressHandle = LiveState<AddressFields, AddressPatch>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CoreRecordOutcome {
    Pending,
    Found,
    Missing,
    Failed,
}

/// Builds live registration state from the configured sources.
#[derive(Clone)]
pub struct FormStateReconciler {
    config: Arc<RegistrationConfig>,
    records: Arc<dyn PatientRecordSource>,
    offline_queue: Arc<dyn OfflineQueue>,
    master_index: Arc<dyn MasterIndexSource>,
    observer: Option<Observer<FormState>>,
    today: Option<NaiveDate>,
}

impl FormStateReconciler {
    pub fn new(
        config: Arc<RegistrationConfig>,
        records: Arc<dyn PatientRecordSource>,
        offline_queue: Arc<dyn OfflineQueue>,
        master_index: Arc<dyn MasterIndexSource>,
    ) -> Self {
        Self {
            config,
            records,
            offline_queue,
            master_index,
            observer: None,
            today: None,
        }
    }

    /// Use one value for all three source roles.
    pub fn from_sources<T>(config: Arc<RegistrationConfig>, sources: Arc<T>) -> Self
    where
        T: PatientRecordSource + OfflineQueue + MasterIndexSource + 'static,
    {
        Self::new(config, sources.clone(), sources.clone(), sources)
    }

    /// Attach an observer to every form handle created from now on.
    pub fn with_observer(mut self, observer: Observer<FormState>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Fix the reference date for birthdate estimates instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Form state for registering a new patient or editing a stored one.
    ///
    /// With no patient uuid this is a new registration: the handle holds the blank state
    /// under a freshly generated uuid and no source is consulted.
    pub fn local_edit(&self, patient_uuid: Option<PatientUuid>) -> FormHandle {
        let initial = match &patient_uuid {
            Some(id) => FormState::blank(id.to_string()),
            None => FormState::new_registration(),
        };
        let mut handle = FormHandle::new(initial, self.observer.clone());
        self.start_local_edit(&mut handle, patient_uuid);
        handle
    }

    /// Start a local-edit cycle on an existing handle.
    ///
    /// Tasks of an earlier cycle are not cancelled; whatever they still deliver is merged
    /// into the state current at that moment.
    pub fn start_local_edit(&self, handle: &mut FormHandle, patient_uuid: Option<PatientUuid>) {
        let Some(patient_uuid) = patient_uuid else {
            return;
        };
        tracing::debug!(%patient_uuid, "reconciling registration form");

        let today = self.today();
        let core = self.spawn_core_record(handle, patient_uuid, move |record| {
            Some(FormPatch::Demographics(Box::new(demographics_from_record(
                &record, today,
            ))))
        });

        let sender = handle.sender();
        let queue = self.offline_queue.clone();
        let draft_gate = core.clone();
        handle.spawn(async move {
            let draft_uuid = patient_uuid.to_string();
            let Some(draft) = draft_after_missing_record(draft_gate, &queue, &draft_uuid, &sender)
                .await
            else {
                return;
            };
            match draft.form_values {
                Some(form_values) => sender.apply(FormPatch::OfflineDraft(Box::new(form_values))),
                None => {
                    tracing::error!(
                        %patient_uuid,
                        "queued offline registration has no form values, ignoring it"
                    );
                    sender.anomaly(
                        SourceKind::OfflineDraft,
                        "queued offline registration has no form values",
                    );
                }
            }
        });

        let records = self.records.clone();
        let sender = handle.sender();
        let free_text_concept = self.config.free_text_field_concept_uuid().clone();
        handle.spawn(async move {
            match records.death_info(&patient_uuid).await {
                Ok(info) => {
                    if let Some(death) = death_fields_from_info(&info, &free_text_concept) {
                        sender.apply(FormPatch::Death(death));
                    }
                }
                Err(error) => sender.failed(SourceKind::DeathInfo, error),
            }
        });

        let records = self.records.clone();
        let sender = handle.sender();
        handle.spawn(async move {
            match records.relationships(&patient_uuid).await {
                Ok(relationships) => sender.apply(FormPatch::Relationships(
                    relationships_for_patient(&patient_uuid.to_string(), relationships),
                )),
                Err(error) => sender.failed(SourceKind::Relationships, error),
            }
        });

        let records = self.records.clone();
        let sender = handle.sender();
        handle.spawn(async move {
            match records.identifiers(&patient_uuid).await {
                Ok(identifiers) => sender.apply(FormPatch::Identifiers(
                    identifiers_from_resources(identifiers),
                )),
                Err(error) => sender.failed(SourceKind::Identifiers, error),
            }
        });

        let records = self.records.clone();
        let sender = handle.sender();
        handle.spawn(async move {
            match records.attributes(&patient_uuid).await {
                Ok(attributes) => {
                    sender.apply(FormPatch::Attributes(attributes_to_form_values(attributes)))
                }
                Err(error) => sender.failed(SourceKind::Attributes, error),
            }
        });

        let Some(encounter_type) = self.config.registration_encounter_type_uuid().cloned() else {
            tracing::debug!("no registration encounter type configured, skipping observations");
            return;
        };
        let records = self.records.clone();
        let sender = handle.sender();
        handle.spawn(async move {
            if resolved(core).await != Some(CoreRecordOutcome::Found) {
                return;
            }
            match records
                .encounters(&patient_uuid, encounter_type.as_str())
                .await
            {
                Ok(encounters) => sender.apply(FormPatch::Observations(
                    latest_encounter_observations(encounters),
                )),
                Err(error) => sender.failed(SourceKind::Encounters, error),
            }
        });
    }

    /// Form state pre-filled from a master patient index record.
    ///
    /// The patient uuid stays the locally generated one; everything the record provides is
    /// merged in one step once it and its identifier types have resolved.
    pub fn master_index_import(&self, source_id: &str) -> FormHandle {
        let mut handle = FormHandle::new(FormState::new_registration(), self.observer.clone());
        let master_index = self.master_index.clone();
        let records = self.records.clone();
        let config = self.config.clone();
        let sender = handle.sender();
        let source_id = source_id.to_string();
        let today = self.today();

        handle.spawn(async move {
            let record = match master_index.patient(&source_id).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    sender.failed(
                        SourceKind::MasterIndex,
                        SourceError::NotFound {
                            resource: "master index record",
                            id: source_id,
                        },
                    );
                    return;
                }
                Err(error) => {
                    sender.failed(SourceKind::MasterIndex, error);
                    return;
                }
            };

            let identifier_types = resolve_identifier_types(&record, &config, &records).await;
            let import = MasterIndexImport {
                demographics: demographics_from_record(&record, today),
                identifiers: identifiers_from_master_index(
                    &record.identifiers,
                    &config,
                    &identifier_types,
                ),
                attributes: phone_attribute_from_record(
                    &record,
                    config.phone_number_attribute_type_uuid(),
                ),
            };
            sender.apply(FormPatch::MasterIndex(Box::new(import)));
        });
        handle
    }

    /// Uuids of the patient's stored name, address and attribute records.
    ///
    /// Starts from `fallback`. In edit mode the core record and the attributes contribute;
    /// for a patient only known to the offline queue the draft's stored map is adopted.
    pub fn patient_uuid_map(
        &self,
        patient_uuid: Option<PatientUuid>,
        fallback: PatientUuidMap,
    ) -> UuidMapHandle {
        let mut handle = UuidMapHandle::new(fallback, None);
        let Some(patient_uuid) = patient_uuid else {
            return handle;
        };

        let core = self.spawn_core_record(&mut handle, patient_uuid, |record| {
            Some(UuidMapPatch::CoreRecord(uuid_map_from_record(&record)))
        });

        let records = self.records.clone();
        let sender = handle.sender();
        let attributes_gate = core.clone();
        handle.spawn(async move {
            if resolved(attributes_gate).await != Some(CoreRecordOutcome::Found) {
                return;
            }
            match records.attributes(&patient_uuid).await {
                Ok(attributes) => {
                    sender.apply(UuidMapPatch::AttributeUuids(attribute_uuid_map(&attributes)))
                }
                Err(error) => sender.failed(SourceKind::Attributes, error),
            }
        });

        let queue = self.offline_queue.clone();
        let sender = handle.sender();
        handle.spawn(async move {
            let draft_uuid = patient_uuid.to_string();
            if let Some(QueuedRegistration {
                patient_uuid_map: Some(map),
                ..
            }) = draft_after_missing_record(core, &queue, &draft_uuid, &sender).await
            {
                sender.apply(UuidMapPatch::OfflineDraft(map));
            }
        });
        handle
    }

    /// Address values to seed the address hierarchy with.
    ///
    /// Starts from `fallback`; for a patient only known to the offline queue the draft's
    /// stored values replace it.
    pub fn initial_address_field_values(
        &self,
        patient_uuid: Option<PatientUuid>,
        fallback: AddressFields,
    ) -> AddressHandle {
        let mut handle = AddressHandle::new(fallback, None);
        let Some(patient_uuid) = patient_uuid else {
            return handle;
        };

        let core = self.spawn_core_record(&mut handle, patient_uuid, |_| None);
        let queue = self.offline_queue.clone();
        let sender = handle.sender();
        handle.spawn(async move {
            let draft_uuid = patient_uuid.to_string();
            if let Some(QueuedRegistration {
                initial_address_field_values: Some(fields),
                ..
            }) = draft_after_missing_record(core, &queue, &draft_uuid, &sender).await
            {
                sender.apply(AddressPatch::OfflineDraft(fields));
            }
        });
        handle
    }

    /// Fetch the core record on `handle`, applying what `on_found` derives from it.
    ///
    /// The returned receiver reports whether a record was found once the fetch completes.
    fn spawn_core_record<S, P, F>(
        &self,
        handle: &mut LiveState<S, P>,
        patient_uuid: PatientUuid,
        on_found: F,
    ) -> watch::Receiver<CoreRecordOutcome>
    where
        S: Clone + Send + Sync + 'static,
        P: Patch<S>,
        F: FnOnce(PatientRecord) -> Option<P> + Send + 'static,
    {
        let (outcome_tx, outcome_rx) = watch::channel(CoreRecordOutcome::Pending);
        let records = self.records.clone();
        let sender = handle.sender();
        handle.spawn(async move {
            let outcome = match records.patient(&patient_uuid).await {
                Ok(Some(record)) => {
                    if let Some(patch) = on_found(record) {
                        sender.apply(patch);
                    }
                    CoreRecordOutcome::Found
                }
                Ok(None) => CoreRecordOutcome::Missing,
                Err(error) => {
                    sender.failed(SourceKind::CoreRecord, error);
                    CoreRecordOutcome::Failed
                }
            };
            outcome_tx.send_replace(outcome);
        });
        outcome_rx
    }
}

/// The core-record outcome once the fetch has completed; `None` if it never will.
async fn resolved(mut core: watch::Receiver<CoreRecordOutcome>) -> Option<CoreRecordOutcome> {
    core.wait_for(|outcome| *outcome != CoreRecordOutcome::Pending)
        .await
        .ok()
        .map(|outcome| *outcome)
}

/// The queued draft for `patient_uuid`, consulted only after the core-record fetch has
/// completed without producing a record.
async fn draft_after_missing_record<S, P>(
    core: watch::Receiver<CoreRecordOutcome>,
    queue: &Arc<dyn OfflineQueue>,
    patient_uuid: &str,
    sender: &PatchSender<S, P>,
) -> Option<QueuedRegistration>
where
    S: Send + 'static,
    P: Patch<S>,
{
    match resolved(core).await {
        Some(CoreRecordOutcome::Missing | CoreRecordOutcome::Failed) => {}
        _ => return None,
    }
    match find_queued_registration(queue.as_ref(), patient_uuid).await {
        Ok(draft) => draft,
        Err(error) => {
            sender.failed(SourceKind::OfflineDraft, error);
            None
        }
    }
}

/// Local identifier types for every mapped system the record carries, looked up
/// concurrently. Lookups that fail or find nothing are left out.
async fn resolve_identifier_types(
    record: &PatientRecord,
    config: &RegistrationConfig,
    records: &Arc<dyn PatientRecordSource>,
) -> HashMap<String, IdentifierType> {
    let type_uuids: BTreeSet<&str> = record
        .identifiers
        .iter()
        .filter_map(|identifier| identifier.system.as_deref())
        .filter_map(|system| config.identifier_type_for_system(system))
        .map(ConceptUuid::as_str)
        .collect();

    let lookups = type_uuids.into_iter().map(|type_uuid| async move {
        (type_uuid, records.identifier_type(type_uuid).await)
    });

    let mut identifier_types = HashMap::new();
    for (type_uuid, lookup) in join_all(lookups).await {
        match lookup {
            Ok(Some(identifier_type)) => {
                identifier_types.insert(type_uuid.to_string(), identifier_type);
            }
            Ok(None) => tracing::debug!("identifier type {type_uuid} does not exist"),
            Err(error) => tracing::warn!("failed to look up identifier type {type_uuid}: {error}"),
        }
    }
    identifier_types
}
