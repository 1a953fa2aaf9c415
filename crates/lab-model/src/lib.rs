//! Laboratory wire/boundary support.
//!
//! This crate provides **wire models** and **parsing helpers** for the raw laboratory records a
//! backend hands to the sample view builder:
//! - samples with their orders, test allocations, statuses and results
//! - reference tables (departments, specimen sources, coded rejection reasons)
//!
//! This crate focuses on:
//! - lenient deserialisation (absent and `null` fields both become empty values)
//! - preserving unknown fields so nothing the backend sends is dropped on the way to the UI
//! - path-aware error messages when a payload does not match the wire schema
//!
//! Derivation of display fields lives in `labview-core`. This crate handles formats only.

pub mod concept;
pub mod lenient;
pub mod order;
pub mod sample;
pub mod status;

// Re-export facades
pub use concept::ReferenceTable;
pub use sample::LabSample;

// Re-export wire types
pub use concept::ConceptRecord;
pub use order::{OrderDetail, RawOrder, ResultRecord, TestAllocation};
pub use sample::{Patient, PatientIdentifier, RawSample};
pub use status::{StatusRecord, Timestamp, UserRef};

/// Unknown fields carried through from the wire payload.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// Errors returned by the `lab-model` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum LabModelError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`LabModelError`].
pub type LabModelResult<T> = Result<T, LabModelError>;

/// Deserialise `T` from JSON text, reporting the failing field path on mismatch.
pub(crate) fn from_json_text<T>(text: &str, what: &str) -> LabModelResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let mut deserializer = serde_json::Deserializer::from_str(text);

    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(parsed) => {
            deserializer.end()?;
            Ok(parsed)
        }
        Err(err) => Err(schema_mismatch(what, err.path().to_string(), err.into_inner())),
    }
}

/// Deserialise `T` from YAML text, reporting the failing field path on mismatch.
pub(crate) fn from_yaml_text<T>(text: &str, what: &str) -> LabModelResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let deserializer = serde_yaml::Deserializer::from_str(text);

    serde_path_to_error::deserialize::<_, T>(deserializer)
        .map_err(|err| schema_mismatch(what, err.path().to_string(), err.into_inner()))
}

fn schema_mismatch(what: &str, path: String, source: impl std::fmt::Display) -> LabModelError {
    let path = if path.is_empty() || path == "." {
        "<root>"
    } else {
        path.as_str()
    };
    LabModelError::Translation(format!("{what} schema mismatch at {path}: {source}"))
}
