//! Person attribute values and the attribute uuid lookup.

use crate::constants::ATTRIBUTE_UUID_KEY_PREFIX;
use crate::form::AttributeMap;
use crate::resources::PersonAttribute;
use std::collections::BTreeMap;

/// Attribute-type uuid to form value.
///
/// Coded attributes store the referenced concept's uuid, not its display text. Attributes
/// without a value are left out.
pub fn attributes_to_form_values(attributes: Vec<PersonAttribute>) -> AttributeMap {
    attributes
        .into_iter()
        .filter_map(|attribute| {
            let value = attribute.value?.into_form_value();
            Some((attribute.attribute_type.uuid, value))
        })
        .collect()
}

/// `attribute.<attribute-type uuid>` to the attribute instance's own uuid.
pub fn attribute_uuid_map(attributes: &[PersonAttribute]) -> BTreeMap<String, String> {
    attributes
        .iter()
        .map(|attribute| {
            (
                format!("{ATTRIBUTE_UUID_KEY_PREFIX}{}", attribute.attribute_type.uuid),
                attribute.uuid.clone(),
            )
        })
        .collect()
}
