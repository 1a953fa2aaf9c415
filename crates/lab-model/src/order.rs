//! Order, test allocation and result wire models.

use crate::{lenient, ConceptRecord, Extra, StatusRecord, Timestamp};
use serde::{Deserialize, Serialize};

/// One order on a sample, wrapping the order proper and its test allocations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawOrder {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderDetail>,

    #[serde(deserialize_with = "lenient::null_default")]
    pub test_allocations: Vec<TestAllocation>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl RawOrder {
    /// The concept of the order proper, if any.
    pub fn concept(&self) -> Option<&ConceptRecord> {
        self.order.as_ref().and_then(|order| order.concept.as_ref())
    }

    /// The uuid of the ordered test concept, if any.
    pub fn concept_uuid(&self) -> Option<&str> {
        self.concept().and_then(|concept| concept.uuid.as_deref())
    }
}

/// The order proper: what was requested.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<ConceptRecord>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// One test parameter instance inside an order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestAllocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<ConceptRecord>,

    #[serde(deserialize_with = "lenient::null_default")]
    pub statuses: Vec<StatusRecord>,

    #[serde(deserialize_with = "lenient::null_default")]
    pub results: Vec<ResultRecord>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl TestAllocation {
    /// The parameter this allocation measures (`concept.uuid`).
    pub fn parameter_uuid(&self) -> Option<&str> {
        self.concept
            .as_ref()
            .and_then(|concept| concept.uuid.as_deref())
    }

    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }
}

/// A recorded result value for a test allocation.
///
/// Value fields are kept as raw JSON because analysers and manual entry disagree on types
/// (numbers sent as strings, coded answers sent as bare uuids, and so on).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResultRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_numeric: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_text: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_coded: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<Timestamp>,

    #[serde(flatten)]
    pub extra: Extra,
}
