//! Names, birthdate, telephone and address derived from a FHIR patient record.

use crate::form::{AddressFields, AttributeMap, FormState, PatientUuidMap};
use chrono::{Datelike, NaiveDate};
use fhir::PatientRecord;
use registration_types::ConceptUuid;

/// Birthdate as stored, with the estimate derived from its precision.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BirthdateEstimate {
    pub birthdate: Option<NaiveDate>,
    pub estimated: bool,
    pub years: u32,
    pub months: u32,
}

/// Derive the birthdate estimate from a stored date string.
///
/// Anything other than a full `YYYY-MM-DD` value counts as estimated. Missing month or day
/// components default to the first of the period. `months` is only reported when the stored
/// value has more than one hyphen-separated component; a year-only value would otherwise
/// imply precision that was never recorded.
pub fn estimate_birthdate(stored: &str, today: NaiveDate) -> BirthdateEstimate {
    let stored = stored.trim();
    let components: Vec<&str> = stored.split('-').collect();
    let estimated = !is_full_date(stored);

    let year = components.first().and_then(|c| leading_int(c));
    let month = components.get(1).and_then(|c| leading_int(c)).unwrap_or(1);
    let day = components.get(2).and_then(|c| leading_int(c)).unwrap_or(1);
    let birthdate = year.and_then(|y| NaiveDate::from_ymd_opt(y as i32, month, day));

    let (years, months) = match (estimated, birthdate) {
        (true, Some(date)) => {
            let elapsed = months_between(date, today).max(0) as u32;
            let months = if components.len() > 1 { elapsed % 12 } else { 0 };
            (elapsed / 12, months)
        }
        _ => (0, 0),
    };

    BirthdateEstimate {
        birthdate,
        estimated,
        years,
        months,
    }
}

/// Whole calendar months from `from` to `to`, truncated toward zero.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let mut months = i64::from(to.year() - from.year()) * 12
        + i64::from(to.month()) - i64::from(from.month());
    if months > 0 && to.day() < from.day() {
        months -= 1;
    } else if months < 0 && to.day() > from.day() {
        months += 1;
    }
    months
}

fn is_full_date(value: &str) -> bool {
    value.len() == 10
        && value.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Integer prefix of `value` (`"06xx"` → 6); `None` when it does not start with a digit.
fn leading_int(value: &str) -> Option<u32> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Fields the core record contributes to the form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoreDemographics {
    pub patient_uuid: String,
    pub given_name: String,
    pub middle_name: String,
    pub family_name: String,
    pub additional_given_name: String,
    pub additional_middle_name: String,
    pub additional_family_name: String,
    pub add_name_in_local_language: bool,
    pub gender: String,
    pub birth: BirthdateEstimate,
    pub telephone_number: String,
    pub address: AddressFields,
}

impl CoreDemographics {
    /// Overlay onto `state`, including the record's patient uuid.
    pub fn apply(self, state: &mut FormState) {
        state.patient_uuid = self.patient_uuid.clone();
        self.apply_fields(state);
    }

    /// Overlay onto `state`, keeping the state's own patient uuid.
    pub fn apply_fields(self, state: &mut FormState) {
        state.given_name = self.given_name;
        state.middle_name = self.middle_name;
        state.family_name = self.family_name;
        state.additional_given_name = self.additional_given_name;
        state.additional_middle_name = self.additional_middle_name;
        state.additional_family_name = self.additional_family_name;
        state.add_name_in_local_language = self.add_name_in_local_language;
        state.gender = self.gender;
        state.birthdate = self.birth.birthdate;
        state.birthdate_estimated = self.birth.estimated;
        state.years_estimated = self.birth.years;
        state.months_estimated = self.birth.months;
        state.telephone_number = self.telephone_number;
        state.address = self.address;
    }
}

pub fn demographics_from_record(record: &PatientRecord, today: NaiveDate) -> CoreDemographics {
    let preferred = record.preferred_name();
    let additional = record.additional_name();

    let owned = |v: Option<&str>| v.unwrap_or_default().to_string();

    CoreDemographics {
        patient_uuid: record.id.clone(),
        given_name: owned(preferred.and_then(|n| n.first_given())),
        middle_name: owned(preferred.and_then(|n| n.middle())),
        family_name: owned(preferred.and_then(|n| n.family.as_deref())),
        additional_given_name: owned(additional.and_then(|n| n.first_given())),
        additional_middle_name: owned(additional.and_then(|n| n.middle())),
        additional_family_name: owned(additional.and_then(|n| n.family.as_deref())),
        add_name_in_local_language: additional.is_some(),
        gender: owned(record.gender.as_deref()),
        birth: record
            .birth_date
            .as_deref()
            .map(|b| estimate_birthdate(b, today))
            .unwrap_or_default(),
        telephone_number: owned(record.primary_telecom_value()),
        address: address_fields_from_record(record),
    }
}

/// Form address fields from the record's primary address.
///
/// FHIR `city`, `state` and `district` map to `cityVillage`, `stateProvince` and
/// `countyDistrict`; hierarchy extension fields keep their own names.
pub fn address_fields_from_record(record: &PatientRecord) -> AddressFields {
    let mut fields = AddressFields::new();
    let Some(address) = record.primary_address() else {
        return fields;
    };

    let mut put = |key: &str, value: &Option<String>| {
        if let Some(v) = value {
            fields.insert(key.to_string(), v.clone());
        }
    };
    put("cityVillage", &address.city);
    put("stateProvince", &address.state);
    put("countyDistrict", &address.district);
    put("country", &address.country);
    put("postalCode", &address.postal_code);

    for (field, value) in &address.hierarchy_fields {
        fields.insert(field.clone(), value.clone());
    }
    fields
}

/// The phone person-attribute value carried by the record's first telecom entry.
pub fn phone_attribute_from_record(
    record: &PatientRecord,
    phone_attribute_type_uuid: Option<&ConceptUuid>,
) -> AttributeMap {
    let mut attributes = AttributeMap::new();
    if let (Some(type_uuid), Some(phone)) = (phone_attribute_type_uuid, record.primary_telecom_value())
    {
        attributes.insert(type_uuid.to_string(), phone.to_string());
    }
    attributes
}

/// Uuids of the record's preferred name, additional name and primary address.
pub fn uuid_map_from_record(record: &PatientRecord) -> PatientUuidMap {
    PatientUuidMap {
        preferred_name_uuid: record.preferred_name().and_then(|n| n.id.clone()),
        additional_name_uuid: record.additional_name().and_then(|n| n.id.clone()),
        preferred_address_uuid: record.primary_address().and_then(|a| a.id.clone()),
        attribute_uuids: Default::default(),
    }
}
