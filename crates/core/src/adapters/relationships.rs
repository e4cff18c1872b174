//! Relationships oriented relative to the registering patient.

use crate::form::RelationshipValue;
use crate::resources::Relationship;

/// Orient each relationship so the other person is the "related" one.
///
/// When the patient is person A the type direction is `aIsToB`, otherwise `bIsToA`. The
/// initial type value is kept for change detection.
pub fn relationships_for_patient(
    patient_uuid: &str,
    relationships: Vec<Relationship>,
) -> Vec<RelationshipValue> {
    relationships
        .into_iter()
        .map(|relationship| {
            let patient_is_a = relationship.person_a.uuid == patient_uuid;
            let (related, direction) = if patient_is_a {
                (relationship.person_b, "aIsToB")
            } else {
                (relationship.person_a, "bIsToA")
            };
            let relationship_type = format!("{}/{direction}", relationship.relationship_type.uuid);

            RelationshipValue {
                uuid: Some(relationship.uuid),
                related_person_name: related.display.unwrap_or_default(),
                related_person_uuid: related.uuid,
                initial_relationship_type_value: Some(relationship_type.clone()),
                relationship_type,
                action: None,
            }
        })
        .collect()
}
