//! Validated identifier types shared across the registration workspace.
//!
//! Registration identifiers follow the hyphenated, lowercase UUID form used by the
//! patient-record REST API (for example `550e8400-e29b-41d4-a716-446655440000`).
//!
//! This crate provides:
//! - [`PatientUuid`], which guarantees the canonical form once constructed and derives the
//!   sharded storage directory for a patient.
//! - [`ConceptUuid`], a trimmed, non-empty reference to a concept or metadata item
//!   (concept, attribute type, encounter type, identifier type).
//!
//! ## Sharded directory layout
//! For a patient `u` (hyphens removed), file-backed sources store resources under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`

use std::path::{Path, PathBuf};
use std::fmt;
use uuid::Uuid;

/// Errors raised when constructing validated identifier types.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The input was not a canonical hyphenated lowercase UUID.
    #[error("invalid patient uuid: '{0}'")]
    InvalidUuid(String),
    /// The input was empty or whitespace only.
    #[error("{0} cannot be empty")]
    Empty(&'static str),
}

/// Result type for identifier construction.
pub type TypesResult<T> = Result<T, TypesError>;

/// A patient identifier in canonical form (36 characters, hyphenated, lowercase).
///
/// # Construction
/// - [`PatientUuid::new`] allocates a fresh identifier for a new registration.
/// - [`PatientUuid::parse`] validates an identifier supplied from outside (CLI, REST path).
///
/// Uppercase or simple (unhyphenated) forms are rejected rather than normalised so that
/// offline drafts, which are matched by string equality, never see two spellings of the
/// same patient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatientUuid(Uuid);

impl Default for PatientUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl PatientUuid {
    /// Generates a new random (v4) patient identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates an identifier that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidUuid`] if `input` is not 36 lowercase hex characters with
    /// hyphens at positions 8, 13, 18 and 23.
    pub fn parse(input: &str) -> TypesResult<Self> {
        if !Self::is_canonical(input) {
            return Err(TypesError::InvalidUuid(input.to_owned()));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|_| TypesError::InvalidUuid(input.to_owned()))
    }

    /// Returns true if `input` is in canonical hyphenated lowercase form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 36
            && input.bytes().enumerate().all(|(i, b)| match i {
                8 | 13 | 18 | 23 => b == b'-',
                _ => matches!(b, b'0'..=b'9' | b'a'..=b'f'),
            })
    }

    /// Returns `parent_dir/<s1>/<s2>/<simple-uuid>/`.
    ///
    /// `s1` and `s2` are the first two pairs of hex characters of the unhyphenated form.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let simple = self.0.simple().to_string();
        parent_dir.join(&simple[0..2]).join(&simple[2..4]).join(&simple)
    }
}

impl fmt::Display for PatientUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl serde::Serialize for PatientUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for PatientUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PatientUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Reference to a concept or metadata item by uuid.
///
/// Concept uuids are not necessarily RFC 4122 values (the CIEL dictionary uses
/// `5622AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA`), so only non-emptiness is enforced. Input is
/// trimmed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConceptUuid(String);

impl ConceptUuid {
    /// # Errors
    ///
    /// Returns [`TypesError::Empty`] if `input` is empty after trimming.
    pub fn new(input: impl AsRef<str>) -> TypesResult<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::Empty("concept uuid"));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConceptUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConceptUuid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for ConceptUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ConceptUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ConceptUuid::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_canonical_uuid() {
        let id = PatientUuid::new().to_string();
        assert_eq!(id.len(), 36);
        assert!(PatientUuid::is_canonical(&id));
    }

    #[test]
    fn parse_accepts_hyphenated_lowercase() {
        let input = "550e8400-e29b-41d4-a716-446655440000";
        let id = PatientUuid::parse(input).expect("canonical uuid");
        assert_eq!(id.to_string(), input);
    }

    #[test]
    fn parse_rejects_simple_and_uppercase_forms() {
        assert!(PatientUuid::parse("550e8400e29b41d4a716446655440000").is_err());
        assert!(PatientUuid::parse("550E8400-E29B-41D4-A716-446655440000").is_err());
        assert!(PatientUuid::parse("").is_err());
    }

    #[test]
    fn sharded_dir_uses_simple_form_prefixes() {
        let id = PatientUuid::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let dir = id.sharded_dir(Path::new("/data"));
        assert_eq!(
            dir,
            PathBuf::from("/data/55/0e/550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn patient_uuid_deserialises_from_json_string() {
        let id: PatientUuid =
            serde_json::from_str("\"550e8400-e29b-41d4-a716-446655440000\"").expect("valid");
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");

        let err = serde_json::from_str::<PatientUuid>("\"not-a-uuid\"");
        assert!(err.is_err());
    }

    #[test]
    fn concept_uuid_trims_and_rejects_blank() {
        let concept = ConceptUuid::new("  5622AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA ").unwrap();
        assert_eq!(concept.as_str(), "5622AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
        assert!(matches!(ConceptUuid::new("   "), Err(TypesError::Empty(_))));
    }
}
