use crate::domain::model::{Record, SanitizedRecord};

pub const DEFAULT_ID_FIELD: &str = "id";

/// Prepares a record for insertion.
///
/// Drops `id_field` so the datastore generates the identifier, and drops every
/// top-level key whose value is null so it is treated as omitted rather than
/// explicitly null. Nested values are passed through untouched. Applying it to
/// an already sanitized record changes nothing.
pub fn sanitize(record: Record, id_field: &str) -> SanitizedRecord {
    let fields = record
        .data
        .into_iter()
        .filter(|(key, value)| key != id_field && !value.is_null())
        .collect();
    SanitizedRecord(fields)
}
