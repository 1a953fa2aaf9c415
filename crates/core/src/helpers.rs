//! Collaborator functions used by the view builder.
//!
//! These are the small, named pieces the order and allocation derivations are composed from:
//! recency ordering, allocation merging, result formatting, remark summaries and user
//! formatting. Each is a pure function of its arguments.

use crate::display::person_name;
use chrono::{DateTime, Utc};
use lab_model::status::{APPROVED, RESULT_REMARKS};
use lab_model::{Extra, RawOrder, ResultRecord, StatusRecord, TestAllocation, UserRef};
use serde::Serialize;
use serde_json::Value;

/// Interpret a status timestamp, logging statuses whose timestamp cannot be read.
pub fn status_instant(status: &StatusRecord) -> Option<DateTime<Utc>> {
    let instant = status.instant();
    if instant.is_none() {
        if let Some(raw) = &status.timestamp {
            tracing::warn!(
                status = status.status.as_deref().unwrap_or_default(),
                timestamp = %raw.0,
                "status timestamp could not be interpreted"
            );
        }
    }
    instant
}

/// Order `items` most recent first.
///
/// The sort is stable, so items with equal instants keep their input order; items without an
/// instant go last.
pub fn most_recent_first<T, F>(items: &[T], instant: F) -> Vec<&T>
where
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    let mut keyed: Vec<(Option<DateTime<Utc>>, &T)> =
        items.iter().map(|item| (instant(item), item)).collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, item)| item).collect()
}

/// Statuses most recent first.
pub fn statuses_most_recent_first(statuses: &[StatusRecord]) -> Vec<&StatusRecord> {
    most_recent_first(statuses, status_instant)
}

/// The latest status or result time recorded on an allocation.
pub fn latest_activity(allocation: &TestAllocation) -> Option<DateTime<Utc>> {
    let status_times = allocation.statuses.iter().filter_map(StatusRecord::instant);
    let result_times = allocation
        .results
        .iter()
        .filter_map(|result| result.date_created.as_ref().and_then(|ts| ts.instant()));
    status_times.chain(result_times).max()
}

/// The merged allocation sequence used for de-duplication.
///
/// Allocations are ordered by latest activity, oldest first, so that when several allocations
/// share a parameter the one encountered last is the most recently worked on. Allocations
/// without any timestamps sort first and otherwise keep their input order.
pub fn merge_test_allocations(allocations: &[TestAllocation]) -> Vec<&TestAllocation> {
    let mut keyed: Vec<(Option<DateTime<Utc>>, &TestAllocation)> = allocations
        .iter()
        .map(|allocation| (latest_activity(allocation), allocation))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, allocation)| allocation).collect()
}

/// A result with its display value resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedResult {
    /// The raw record, with `value` replaced by the resolved value.
    #[serde(flatten)]
    pub record: ResultRecord,

    /// Text to show for the value (coded answers show their display name).
    pub display_value: Option<String>,
}

/// Format allocation results for display: most recent first, each with a resolved value.
///
/// The value is taken from the first populated of `valueNumeric`, `valueText`, `valueCoded`,
/// `valueBoolean`, `value`. Coded answers resolve to their uuid so the UI can look them up in
/// the order's `keyedAnswers`; their display name becomes `displayValue`.
pub fn format_results(results: &[ResultRecord]) -> Vec<FormattedResult> {
    most_recent_first(results, |result| {
        result.date_created.as_ref().and_then(|ts| ts.instant())
    })
    .into_iter()
    .map(format_result)
    .collect()
}

fn format_result(result: &ResultRecord) -> FormattedResult {
    let raw = [
        &result.value_numeric,
        &result.value_text,
        &result.value_coded,
        &result.value_boolean,
        &result.value,
    ]
    .into_iter()
    .flatten()
    .find(|value| !value.is_null());

    let (value, display_value) = match raw {
        Some(Value::Object(coded)) => {
            let uuid = coded.get("uuid").cloned();
            let display = coded
                .get("display")
                .or_else(|| coded.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let display = display.or_else(|| uuid.as_ref().and_then(value_text));
            (uuid, display)
        }
        Some(other) => (Some(other.clone()), value_text(other)),
        None => (None, None),
    };

    let mut record = result.clone();
    record.value = value;
    record.extra.remove("displayValue");
    FormattedResult {
        record,
        display_value,
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Summary of the remarks left on an allocation's results.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsCommentsStatuses {
    pub count: usize,
    pub latest: Option<StatusRecord>,
    pub comments: Vec<StatusRecord>,
}

/// Collect remark-bearing statuses (category `RESULT_REMARKS` or non-empty `remarks`), most
/// recent first.
pub fn results_comments_statuses(statuses: &[StatusRecord]) -> ResultsCommentsStatuses {
    let comments: Vec<StatusRecord> = statuses_most_recent_first(statuses)
        .into_iter()
        .filter(|status| {
            status.category_is(RESULT_REMARKS)
                || status
                    .remarks
                    .as_deref()
                    .is_some_and(|remarks| !remarks.trim().is_empty())
        })
        .cloned()
        .collect();

    ResultsCommentsStatuses {
        count: comments.len(),
        latest: comments.first().cloned(),
        comments,
    }
}

/// The most recent APPROVED status across all allocations of an order.
pub fn authorization_details_by_order(order: &RawOrder) -> Option<&StatusRecord> {
    let approvals: Vec<&StatusRecord> = order
        .test_allocations
        .iter()
        .flat_map(|allocation| allocation.statuses.iter())
        .filter(|status| status.is_kind(APPROVED))
        .collect();

    most_recent_first(&approvals, |status| status_instant(status))
        .first()
        .map(|status| **status)
}

/// The user who made a status change, with role suffixes dropped from their names.
pub fn format_user_changed_status(status: Option<&StatusRecord>) -> Option<UserRef> {
    let user = status?.user.as_ref()?;
    Some(UserRef {
        uuid: user.uuid.clone(),
        display: person_name(user.display.as_deref()),
        name: person_name(user.name.as_deref()),
        extra: user.extra.clone(),
    })
}

/// Clone `extra` without the keys a view struct defines itself.
pub(crate) fn passthrough(extra: &Extra, reserved: &[&str]) -> Extra {
    extra
        .iter()
        .filter(|(key, _)| !reserved.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Serialise a record into a JSON object; anything else becomes an empty object.
pub(crate) fn to_object<T: Serialize>(value: &T) -> Extra {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Extra::new(),
        Err(err) => {
            tracing::warn!(error = %err, "could not serialise record into an object");
            Extra::new()
        }
    }
}
