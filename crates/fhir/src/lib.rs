//! FHIR wire/boundary support for patient registration.
//!
//! This crate provides the **wire model** and **translation helpers** for FHIR `Patient`
//! resources received from the local FHIR endpoint or from a master patient index:
//! - JSON deserialisation with path-aware error messages
//! - translation into a typed, read-only [`PatientRecord`]
//! - accessors for the conventions registration relies on (first name is preferred, second
//!   name is the local-language name, first address and first telecom are primary)
//!
//! Unlike locally owned files, imported resources are parsed leniently: unknown keys are
//! ignored because servers routinely add `meta`, `text` and profile extensions.

pub mod patient;

pub use patient::{Address, ContactPoint, HumanName, Identifier, Patient, PatientRecord};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),
}
