//! Sample wire models and parsing.
//!
//! A sample is the aggregate root handed to the view builder: patient and creator metadata, the
//! sample's own status history, and its orders.

use crate::{
    from_json_text, from_yaml_text, lenient, ConceptRecord, Extra, LabModelResult, RawOrder,
    StatusRecord, Timestamp, UserRef,
};
use serde::{Deserialize, Serialize};

/// A raw laboratory sample as delivered by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Patient>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub voided: Option<bool>,

    /// Sample-wide classification concept (specimen type).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<ConceptRecord>,

    #[serde(deserialize_with = "lenient::null_default")]
    pub statuses: Vec<StatusRecord>,

    #[serde(deserialize_with = "lenient::null_default")]
    pub orders: Vec<RawOrder>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// The patient a sample was taken from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(deserialize_with = "lenient::null_default")]
    pub identifiers: Vec<PatientIdentifier>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// One identifier of a patient; the first one is the medical record number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientIdentifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Sample operations.
///
/// This is a zero-sized type used for namespacing sample parsing.
/// All methods are associated functions.
pub struct LabSample;

impl LabSample {
    /// Parse a raw sample from JSON text.
    ///
    /// Absent and `null` fields resolve to empty values; only structurally wrong payloads
    /// (for example a string where a list is expected) are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LabModelError`] if the text is not JSON or does not match the sample
    /// wire schema. The message carries the path to the failing field where available.
    pub fn parse_json(json_text: &str) -> LabModelResult<RawSample> {
        from_json_text(json_text, "Sample")
    }

    /// Parse a raw sample from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LabModelError`] on malformed YAML or a schema mismatch.
    pub fn parse_yaml(yaml_text: &str) -> LabModelResult<RawSample> {
        from_yaml_text(yaml_text, "Sample")
    }

    /// Render a raw sample back to JSON text, unknown fields included.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LabModelError`] if serialisation fails.
    pub fn render_json(sample: &RawSample) -> LabModelResult<String> {
        Ok(serde_json::to_string(sample)?)
    }
}
