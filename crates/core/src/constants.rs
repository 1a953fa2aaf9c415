//! Constants used throughout the labview core crate.
//!
//! Text conventions, default formats and environment variable names live here so the builder,
//! the configuration layer and the CLI agree on them.

/// Separator between a legacy department prefix and the concept name ("Chemistry: Glucose").
pub const CONCEPT_PREFIX_SEPARATOR: char = ':';

/// Marker that starts the role/site suffix of a person display name ("Jane Doe (Lab Tech)").
pub const PERSON_SUFFIX_MARKER: &str = " (";

/// Default chrono format for the calendar part of status dates (US locale style, 3/1/2024).
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// Chrono format for the time-of-day part of status dates.
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M";

/// Default `tracing` directive installed by binaries.
pub const DEFAULT_LOG_DIRECTIVE: &str = "labview=info";

/// Environment variable holding the UTC offset used to render status dates (e.g. `+03:00`).
pub const ENV_UTC_OFFSET: &str = "LABVIEW_UTC_OFFSET";

/// Environment variable holding the chrono format for the calendar part of status dates.
pub const ENV_DATE_FORMAT: &str = "LABVIEW_DATE_FORMAT";

/// Environment variable selecting the sample concept field used for sample-level lookups.
pub const ENV_SAMPLE_CONCEPT_KEY: &str = "LABVIEW_SAMPLE_CONCEPT_KEY";
