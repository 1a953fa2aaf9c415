//! Status history wire models.
//!
//! Samples and test allocations both carry an ordered list of lifecycle statuses. The `status`
//! field is usually a lifecycle keyword (see the constants below), but rejection statuses carry
//! the coded rejection reason uuid there and put `REJECTED` in `category` instead.

use crate::Extra;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ACCEPTED: &str = "ACCEPTED";
pub const APPROVED: &str = "APPROVED";
pub const AUTHORIZED: &str = "AUTHORIZED";
pub const REJECTED: &str = "REJECTED";
pub const RELEASED: &str = "RELEASED";
pub const RESTRICTED: &str = "RESTRICTED";

/// Category of the status written when results were pushed by an analyser integration.
pub const RESULTS_INTEGRATION: &str = "RESULTS_INTEGRATION";

/// Category of the status used to attach remarks to results.
pub const RESULT_REMARKS: &str = "RESULT_REMARKS";

/// A user reference as embedded in statuses and sample metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// One lifecycle event on a sample or test allocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl StatusRecord {
    /// True when the `status` field equals `kind` exactly.
    pub fn status_is(&self, kind: &str) -> bool {
        self.status.as_deref() == Some(kind)
    }

    /// True when the `category` field equals `kind` exactly.
    pub fn category_is(&self, kind: &str) -> bool {
        self.category.as_deref() == Some(kind)
    }

    /// True when either `status` or `category` equals `kind`.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.status_is(kind) || self.category_is(kind)
    }

    /// True when the `category` field contains `needle` anywhere.
    pub fn category_contains(&self, needle: &str) -> bool {
        self.category
            .as_deref()
            .is_some_and(|category| category.contains(needle))
    }

    /// The point in time this status was recorded, when it can be interpreted.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_ref().and_then(Timestamp::instant)
    }
}

/// A timestamp exactly as the backend sent it.
///
/// Backends send epoch milliseconds (as a number or a numeric string) or ISO-8601 text. The raw
/// value is kept so that re-serialising a status does not change it; [`Timestamp::instant`]
/// interprets it on demand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub serde_json::Value);

impl Timestamp {
    /// Build a timestamp from epoch milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        Self(serde_json::Value::from(millis))
    }

    /// Interpret the raw value as an instant.
    ///
    /// Returns `None` when the value is neither epoch milliseconds nor a recognised date string.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match &self.0 {
            serde_json::Value::Number(number) => {
                let millis = number
                    .as_i64()
                    .or_else(|| number.as_f64().map(|value| value as i64))?;
                DateTime::from_timestamp_millis(millis)
            }
            serde_json::Value::String(text) => parse_text_instant(text.trim()),
            _ => None,
        }
    }
}

fn parse_text_instant(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(millis) = text.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    // OpenMRS style: 2024-03-01T10:15:00.000+0300
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn status(value: serde_json::Value) -> StatusRecord {
        serde_json::from_value(value).expect("status should parse")
    }

    #[test]
    fn interprets_epoch_millis_number() {
        let ts = Timestamp::from_millis(1_700_000_000_000);
        let expected = Utc.timestamp_millis_opt(1_700_000_000_000).single();
        assert_eq!(ts.instant(), expected);
    }

    #[test]
    fn interprets_numeric_string() {
        let ts = Timestamp(serde_json::json!("1700000000000"));
        assert_eq!(
            ts.instant(),
            Utc.timestamp_millis_opt(1_700_000_000_000).single()
        );
    }

    #[test]
    fn interprets_openmrs_date_string() {
        let ts = Timestamp(serde_json::json!("2024-03-01T10:15:00.000+0300"));
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 7, 15, 0).single();
        assert_eq!(ts.instant(), expected);
    }

    #[test]
    fn interprets_rfc3339_string() {
        let ts = Timestamp(serde_json::json!("2024-03-01T07:15:00Z"));
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 7, 15, 0).single();
        assert_eq!(ts.instant(), expected);
    }

    #[test]
    fn garbage_has_no_instant() {
        assert_eq!(Timestamp(serde_json::json!("not a date")).instant(), None);
        assert_eq!(Timestamp(serde_json::json!(true)).instant(), None);
        assert_eq!(Timestamp(serde_json::Value::Null).instant(), None);
    }

    #[test]
    fn kind_checks_look_at_status_and_category() {
        let by_status = status(serde_json::json!({"status": "APPROVED"}));
        let by_category = status(serde_json::json!({"status": "x", "category": "APPROVED"}));
        assert!(by_status.is_kind(APPROVED));
        assert!(by_category.is_kind(APPROVED));
        assert!(!by_category.status_is(APPROVED));
    }

    #[test]
    fn category_substring_match() {
        let rejected = status(serde_json::json!({"category": "SAMPLE_REJECTED"}));
        assert!(rejected.category_contains(REJECTED));
        assert!(!StatusRecord::default().category_contains(REJECTED));
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let input = serde_json::json!({
            "status": "RELEASED",
            "timestamp": 1_700_000_000_000_i64,
            "remarks": "ok",
            "sample": {"uuid": "s1"}
        });
        let parsed = status(input.clone());
        assert_eq!(parsed.extra.get("sample"), input.get("sample"));
        let output = serde_json::to_value(&parsed).expect("serialise");
        assert_eq!(output, input);
    }
}
