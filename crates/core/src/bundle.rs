//! Loading raw samples and reference tables from files.
//!
//! The input format is chosen from the file extension: `.json`, or `.yaml`/`.yml`.

use crate::{ViewError, ViewResult};
use lab_model::{ConceptRecord, LabModelResult, LabSample, RawSample, ReferenceTable};
use std::fs;
use std::path::Path;

/// Supported input file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Yaml,
}

impl InputFormat {
    /// Pick the format from a path's extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::UnsupportedFormat`] for any other extension, or none.
    pub fn from_path(path: &Path) -> ViewResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Ok(InputFormat::Json),
            Some("yaml") | Some("yml") => Ok(InputFormat::Yaml),
            _ => Err(ViewError::UnsupportedFormat(format!(
                "{} (expected .json, .yaml or .yml)",
                path.display()
            ))),
        }
    }
}

/// Load a raw sample from a JSON or YAML file.
///
/// # Errors
///
/// Returns a [`ViewError`] if the extension is unsupported, the file cannot be read, or its
/// contents do not match the sample wire schema.
pub fn load_sample(path: &Path) -> ViewResult<RawSample> {
    load(path, LabSample::parse_json, LabSample::parse_yaml)
}

/// Load a reference table (department, specimen source or rejection reason list).
///
/// # Errors
///
/// Returns a [`ViewError`] if the extension is unsupported, the file cannot be read, or an
/// entry does not match the concept wire schema.
pub fn load_reference_table(path: &Path) -> ViewResult<Vec<ConceptRecord>> {
    load(path, ReferenceTable::parse_json, ReferenceTable::parse_yaml)
}

/// Load a reference table if a path was given; no path means an empty table.
///
/// # Errors
///
/// See [`load_reference_table`].
pub fn load_reference_table_opt(path: Option<&Path>) -> ViewResult<Vec<ConceptRecord>> {
    match path {
        Some(path) => load_reference_table(path),
        None => Ok(Vec::new()),
    }
}

fn load<T>(
    path: &Path,
    parse_json: fn(&str) -> LabModelResult<T>,
    parse_yaml: fn(&str) -> LabModelResult<T>,
) -> ViewResult<T> {
    let format = InputFormat::from_path(path)?;

    let text = fs::read_to_string(path).map_err(|source| ViewError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed = match format {
        InputFormat::Json => parse_json(&text),
        InputFormat::Yaml => parse_yaml(&text),
    };

    let value = parsed.map_err(|source| ViewError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), ?format, "loaded input file");
    Ok(value)
}
