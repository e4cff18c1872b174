//! Typed partial updates sent by sources to the state coordinator.
//!
//! Each source owns a fixed slice of the state and every patch writes only that slice, so
//! the order in which independent sources arrive does not change the merged result.

use crate::adapters::death::DeathFields;
use crate::adapters::demographics::CoreDemographics;
use crate::form::{
    AddressFields, AttributeMap, FormState, IdentifierMap, ObservationMap, PatientUuidMap,
    RelationshipValue,
};
use std::collections::BTreeMap;
use std::fmt;

/// The data source a patch or event originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    CoreRecord,
    OfflineDraft,
    DeathInfo,
    Relationships,
    Identifiers,
    Attributes,
    Encounters,
    MasterIndex,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::CoreRecord => "core-record",
            SourceKind::OfflineDraft => "offline-draft",
            SourceKind::DeathInfo => "death-info",
            SourceKind::Relationships => "relationships",
            SourceKind::Identifiers => "identifiers",
            SourceKind::Attributes => "attributes",
            SourceKind::Encounters => "encounters",
            SourceKind::MasterIndex => "master-index",
        };
        f.write_str(name)
    }
}

/// A partial update applicable to state `S`.
pub trait Patch<S>: Send + 'static {
    fn source(&self) -> SourceKind;

    /// Overlay this patch onto the current state.
    fn apply(self, state: &mut S);
}

/// Everything a master-index import contributes, merged in one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasterIndexImport {
    pub demographics: CoreDemographics,
    pub identifiers: IdentifierMap,
    pub attributes: AttributeMap,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormPatch {
    Demographics(Box<CoreDemographics>),
    /// A queued offline draft, adopted verbatim.
    OfflineDraft(Box<FormState>),
    Death(DeathFields),
    Relationships(Vec<RelationshipValue>),
    Identifiers(IdentifierMap),
    Attributes(AttributeMap),
    Observations(ObservationMap),
    MasterIndex(Box<MasterIndexImport>),
}

impl Patch<FormState> for FormPatch {
    fn source(&self) -> SourceKind {
        match self {
            FormPatch::Demographics(_) => SourceKind::CoreRecord,
            FormPatch::OfflineDraft(_) => SourceKind::OfflineDraft,
            FormPatch::Death(_) => SourceKind::DeathInfo,
            FormPatch::Relationships(_) => SourceKind::Relationships,
            FormPatch::Identifiers(_) => SourceKind::Identifiers,
            FormPatch::Attributes(_) => SourceKind::Attributes,
            FormPatch::Observations(_) => SourceKind::Encounters,
            FormPatch::MasterIndex(_) => SourceKind::MasterIndex,
        }
    }

    fn apply(self, state: &mut FormState) {
        match self {
            FormPatch::Demographics(demographics) => demographics.apply(state),
            FormPatch::OfflineDraft(draft) => *state = *draft,
            FormPatch::Death(death) => death.apply(state),
            FormPatch::Relationships(relationships) => state.relationships = relationships,
            FormPatch::Identifiers(identifiers) => state.identifiers = identifiers,
            FormPatch::Attributes(attributes) => state.attributes = attributes,
            FormPatch::Observations(obs) => state.obs = obs,
            FormPatch::MasterIndex(import) => {
                let MasterIndexImport {
                    demographics,
                    identifiers,
                    attributes,
                } = *import;
                demographics.apply_fields(state);
                state.identifiers = identifiers;
                state.attributes = attributes;
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UuidMapPatch {
    /// Name and address uuids from the core record; attribute entries are kept.
    CoreRecord(PatientUuidMap),
    /// The queued draft's stored map, adopted verbatim.
    OfflineDraft(PatientUuidMap),
    AttributeUuids(BTreeMap<String, String>),
}

impl Patch<PatientUuidMap> for UuidMapPatch {
    fn source(&self) -> SourceKind {
        match self {
            UuidMapPatch::CoreRecord(_) => SourceKind::CoreRecord,
            UuidMapPatch::OfflineDraft(_) => SourceKind::OfflineDraft,
            UuidMapPatch::AttributeUuids(_) => SourceKind::Attributes,
        }
    }

    fn apply(self, state: &mut PatientUuidMap) {
        match self {
            UuidMapPatch::CoreRecord(from_record) => {
                state.preferred_name_uuid = from_record.preferred_name_uuid;
                state.additional_name_uuid = from_record.additional_name_uuid;
                state.preferred_address_uuid = from_record.preferred_address_uuid;
                state.attribute_uuids.extend(from_record.attribute_uuids);
            }
            UuidMapPatch::OfflineDraft(map) => *state = map,
            UuidMapPatch::AttributeUuids(uuids) => state.attribute_uuids.extend(uuids),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressPatch {
    OfflineDraft(AddressFields),
}

impl Patch<AddressFields> for AddressPatch {
    fn source(&self) -> SourceKind {
        SourceKind::OfflineDraft
    }

    fn apply(self, state: &mut AddressFields) {
        match self {
            AddressPatch::OfflineDraft(fields) => *state = fields,
        }
    }
}
