use std::path::PathBuf;

/// Errors raised at the edges of the core crate: configuration, input loading, rendering.
///
/// Building a view never fails; see [`crate::SampleViewBuilder::build`].
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to read input file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: lab_model::LabModelError,
    },
    #[error("lab model error: {0}")]
    LabModel(#[from] lab_model::LabModelError),
    #[error("failed to serialize sample view: {0}")]
    Serialization(serde_json::Error),
}

pub type ViewResult<T> = std::result::Result<T, ViewError>;
