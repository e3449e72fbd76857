//! Insert-time checks of a record against its table's schema.
//!
//! Only presence is checked: a non-nullable field must appear as a key in the
//! record. An explicit `null` counts as present, and values are not compared
//! against the declared field type.

use crate::data_types::Record;
use crate::schema::Field;

pub fn required_field_message(field: &Field) -> String {
    format!("Field {} is required", field.name)
}

/// Check `record` against `fields`, collecting every violation instead of
/// stopping at the first one.
pub fn validate_record(fields: &[Field], record: &Record) -> Result<(), Vec<String>> {
    let errors: Vec<String> = fields
        .iter()
        .filter(|field| !field.nullable && !record.contains_key(&field.name))
        .map(required_field_message)
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
