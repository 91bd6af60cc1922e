//! Field redirection policy.

use crate::{FieldDefinition, FieldValue};
use std::collections::HashSet;

/// Decide whether a field's value lives in document metadata instead of the
/// block's own markup.
///
/// True only when the definition carries a truthy redirect flag; an absent
/// flag means "keep local".
pub fn should_redirect(field: &FieldDefinition) -> bool {
    field.redirect.as_ref().is_some_and(is_truthy)
}

/// Names of the fields in `fields` that are redirected.
pub fn redirected_field_names<'a, I>(fields: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a FieldDefinition>,
{
    fields
        .into_iter()
        .filter(|field| should_redirect(field))
        .map(|field| field.name.clone())
        .collect()
}

/// Loose truthiness of a host flag value.
fn is_truthy(flag: &FieldValue) -> bool {
    match flag {
        FieldValue::Bool(b) => *b,
        FieldValue::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        FieldValue::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        FieldValue::Null | FieldValue::Array(_) | FieldValue::Object(_) => false,
    }
}
