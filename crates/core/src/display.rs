//! Display-text normalisation.

use crate::constants::{CONCEPT_PREFIX_SEPARATOR, PERSON_SUFFIX_MARKER};

/// Strip a legacy "Department: " prefix from a concept display name.
///
/// Only the first separator counts; the remainder is trimmed. Names without a separator are
/// returned unchanged.
pub fn strip_concept_prefix(display: &str) -> &str {
    match display.split_once(CONCEPT_PREFIX_SEPARATOR) {
        Some((_, name)) => name.trim(),
        None => display,
    }
}

/// Drop the "(role/site)" suffix from a person display name.
pub fn person_display_name(display: &str) -> &str {
    match display.split_once(PERSON_SUFFIX_MARKER) {
        Some((name, _)) => name,
        None => display,
    }
}

pub(crate) fn stripped_concept_display(display: Option<&str>) -> Option<String> {
    display.map(strip_concept_prefix).map(str::to_string)
}

pub(crate) fn person_name(display: Option<&str>) -> Option<String> {
    display.map(person_display_name).map(str::to_string)
}
