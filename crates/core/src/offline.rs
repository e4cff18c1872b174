//! Lookup of queued offline registrations.

use crate::error::SourceResult;
use crate::form::{AddressFields, FormState, PatientUuidMap};
use crate::sources::OfflineQueue;
use serde::{Deserialize, Serialize};

/// A registration saved while offline and not yet synchronised.
///
/// The draft belongs to the patient named in its form values. The top-level
/// `patient_uuid` only identifies entries whose form values were lost.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRegistration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_uuid: Option<String>,
    #[serde(default)]
    pub form_values: Option<FormState>,
    #[serde(default)]
    pub patient_uuid_map: Option<PatientUuidMap>,
    #[serde(default)]
    pub initial_address_field_values: Option<AddressFields>,
}

impl QueuedRegistration {
    /// A draft holding `form_values`, keyed by their patient uuid.
    pub fn from_form_values(form_values: FormState) -> Self {
        Self {
            form_values: Some(form_values),
            ..Self::default()
        }
    }

    /// Patient uuid the draft was saved for.
    pub fn stored_patient_uuid(&self) -> Option<&str> {
        match &self.form_values {
            Some(values) if !values.patient_uuid.is_empty() => Some(&values.patient_uuid),
            _ => self.patient_uuid.as_deref(),
        }
    }
}

/// First queued registration whose stored patient uuid equals `patient_uuid`.
pub async fn find_queued_registration(
    queue: &dyn OfflineQueue,
    patient_uuid: &str,
) -> SourceResult<Option<QueuedRegistration>> {
    let registrations = queue.queued_registrations().await?;
    Ok(registrations
        .into_iter()
        .find(|r| r.stored_patient_uuid() == Some(patient_uuid)))
}
