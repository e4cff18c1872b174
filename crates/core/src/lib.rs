//! # Registration Core
//!
//! Reconciliation of the patient registration form state.
//!
//! A registration screen needs one consistent form state assembled from several independent
//! sources: the stored core record, death information, person attributes, identifiers,
//! relationships, the latest registration encounter, a queued offline draft, or a master
//! patient index record. This crate contains:
//! - the form state model and the typed patches each source contributes
//! - a single-owner coordinator ([`live::LiveState`]) merging patches as they arrive
//! - pure adapters from source resources to form fields
//! - the [`FormStateReconciler`] wiring sources to the coordinator
//! - in-memory and sharded file-backed source implementations
//!
//! **No transport concerns**: HTTP servers and command-line handling live in the binaries.

pub mod adapters;
pub mod config;
pub mod constants;
pub mod error;
pub mod form;
pub mod live;
pub mod offline;
pub mod patch;
pub mod reconciler;
pub mod resources;
pub mod sources;

pub use config::{IdentifierMapping, RegistrationConfig};
pub use error::{RegistrationError, RegistrationResult, SourceError, SourceResult};
pub use form::{AddressFields, FormState, IdentifierRecord, PatientUuidMap, RelationshipValue};
pub use live::{LiveState, Observer, StateEvent};
pub use patch::SourceKind;
pub use reconciler::{AddressHandle, FormHandle, FormStateReconciler, UuidMapHandle};
pub use sources::{FileSources, InMemorySources};
