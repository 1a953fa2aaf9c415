//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the view builder. The builder never reads environment variables itself, so two
//! builds from the same inputs and the same configuration always agree.

use crate::constants::DEFAULT_DATE_FORMAT;
use crate::{ViewError, ViewResult};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use lab_model::ConceptRecord;
use std::str::FromStr;

/// Which field of the sample's own concept keys the sample-level department/specimen lookup.
///
/// Orders are always looked up by `concept.uuid`. Samples have historically been looked up by
/// `concept.uid`, which some backends do not populate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConceptKey {
    #[default]
    Uid,
    Uuid,
}

impl ConceptKey {
    /// Read the configured key field from a concept.
    pub fn key_of<'a>(&self, concept: &'a ConceptRecord) -> Option<&'a str> {
        match self {
            ConceptKey::Uid => concept.uid.as_deref(),
            ConceptKey::Uuid => concept.uuid.as_deref(),
        }
    }
}

impl FromStr for ConceptKey {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uid" => Ok(ConceptKey::Uid),
            "uuid" => Ok(ConceptKey::Uuid),
            other => Err(ViewError::InvalidConfig(format!(
                "sample concept key must be 'uid' or 'uuid', got '{other}'"
            ))),
        }
    }
}

/// View configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ViewConfig {
    now: DateTime<Utc>,
    utc_offset: FixedOffset,
    date_format: String,
    sample_concept_key: ConceptKey,
}

impl ViewConfig {
    /// Create a new `ViewConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::InvalidConfig`] if `date_format` is empty or not a valid chrono
    /// format string.
    pub fn new(
        now: DateTime<Utc>,
        utc_offset: FixedOffset,
        date_format: String,
        sample_concept_key: ConceptKey,
    ) -> ViewResult<Self> {
        validate_date_format(&date_format)?;

        Ok(Self {
            now,
            utc_offset,
            date_format,
            sample_concept_key,
        })
    }

    /// Same configuration, different reference instant for relative times.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn sample_concept_key(&self) -> ConceptKey {
        self.sample_concept_key
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            now: Utc::now(),
            utc_offset: Utc.fix(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            sample_concept_key: ConceptKey::default(),
        }
    }
}

/// Check that a chrono format string is usable for rendering.
///
/// Rendering with an invalid format would fail inside `Display`, so this is checked up front.
pub fn validate_date_format(format: &str) -> ViewResult<()> {
    if format.trim().is_empty() {
        return Err(ViewError::InvalidConfig(
            "date format cannot be empty".into(),
        ));
    }

    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ViewError::InvalidConfig(format!(
            "date format '{format}' is not a valid chrono format"
        )));
    }

    Ok(())
}

/// Parse the display UTC offset from an optional string value.
///
/// Accepts `Z`, `UTC`, `+HH:MM`, `+HHMM` and `+HH` (and the `-` forms). If `value` is `None` or
/// empty/whitespace, returns UTC.
pub fn utc_offset_from_env_value(value: Option<String>) -> ViewResult<FixedOffset> {
    let Some(value) = non_empty(value) else {
        return Ok(Utc.fix());
    };

    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    parse_offset(&value).ok_or_else(|| {
        ViewError::InvalidConfig(format!(
            "UTC offset must look like +03:00 or -0500, got '{value}'"
        ))
    })
}

/// Parse the calendar date format from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_DATE_FORMAT`].
pub fn date_format_from_env_value(value: Option<String>) -> ViewResult<String> {
    match non_empty(value) {
        Some(format) => {
            validate_date_format(&format)?;
            Ok(format)
        }
        None => Ok(DEFAULT_DATE_FORMAT.to_string()),
    }
}

/// Parse the sample concept key from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`ConceptKey::Uid`].
pub fn sample_concept_key_from_env_value(value: Option<String>) -> ViewResult<ConceptKey> {
    let parsed = non_empty(value)
        .map(|v| v.parse::<ConceptKey>())
        .transpose()?;

    Ok(parsed.unwrap_or_default())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    if !rest.is_ascii() {
        return None;
    }

    let (hours, minutes) = match rest.split_once(':') {
        Some(parts) => parts,
        None if rest.len() == 4 => rest.split_at(2),
        None if rest.len() == 2 => (rest, "00"),
        None => return None,
    };

    let all_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(hours) || !all_digits(minutes) {
        return None;
    }

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
