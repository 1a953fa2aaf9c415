//! Concept wire models and reference tables.
//!
//! Departments, specimen sources and coded rejection reasons all arrive as flat sequences of
//! concept records. A department or specimen source lists the test orders it covers as
//! `setMembers`; each test order in turn lists its parameters as `setMembers` and any coded
//! answers as `answers`.

use crate::{from_json_text, from_yaml_text, lenient, Extra, LabModelResult};
use serde::{Deserialize, Serialize};

/// A concept as referenced by samples, orders, allocations and reference tables.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConceptRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    /// Secondary identifier some backends put on the sample-level concept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(deserialize_with = "lenient::null_default")]
    pub set_members: Vec<ConceptRecord>,

    #[serde(deserialize_with = "lenient::null_default")]
    pub answers: Vec<ConceptRecord>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Reference table operations.
///
/// This is a zero-sized type used for namespacing reference-table parsing.
/// All methods are associated functions.
pub struct ReferenceTable;

impl ReferenceTable {
    /// Parse a reference table (a sequence of concept records) from JSON text.
    ///
    /// A bare `null` document is treated as an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LabModelError`] if the text is not JSON or any entry has an unexpected
    /// field type. The message names the failing entry (e.g. `[2]`).
    pub fn parse_json(json_text: &str) -> LabModelResult<Vec<ConceptRecord>> {
        let table: Option<Vec<ConceptRecord>> = from_json_text(json_text, "Reference table")?;
        Ok(table.unwrap_or_default())
    }

    /// Parse a reference table from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LabModelError`] on malformed YAML or a schema mismatch.
    pub fn parse_yaml(yaml_text: &str) -> LabModelResult<Vec<ConceptRecord>> {
        let table: Option<Vec<ConceptRecord>> = from_yaml_text(yaml_text, "Reference table")?;
        Ok(table.unwrap_or_default())
    }
}
