//! Order enrichment.
//!
//! Each raw order is reshaped for display against the sample's department and specimen-source
//! indexes: normalised concept names, search text, sub-test members, coded answers, a
//! de-duplicated allocation list and a per-parameter history of allocations with results.

use crate::allocation::{enrich_allocation, AllocationView};
use crate::display::{person_name, stripped_concept_display};
use crate::helpers::{
    authorization_details_by_order, merge_test_allocations, passthrough, to_object,
};
use crate::lookup::{IndexedConcept, ReferenceIndex, PARENT_FIELD};
use lab_model::{ConceptRecord, Extra, OrderDetail, RawOrder, StatusRecord, TestAllocation, UserRef};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

const ORDER_VIEW_FIELDS: &[&str] = &[
    "order",
    "authorizationInfo",
    "searchingText",
    "firstSignOff",
    "secondSignOff",
    "collected",
    "collectedBy",
    "accepted",
    "acceptedBy",
    "allocationStatuses",
    "testAllocations",
    "allocationsGroupedByParameterUuid",
];

const ORDER_DETAIL_FIELDS: &[&str] = &["uuid", "concept"];

const ORDER_CONCEPT_FIELDS: &[&str] = &[
    "uuid",
    "uid",
    "display",
    "setMembers",
    "answers",
    "keyedAnswers",
];

/// An order enriched for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub extra: Extra,

    pub order: OrderDetailView,

    /// The most recent approval across the order's allocations.
    pub authorization_info: Option<StatusRecord>,

    /// Lower-cased order and sub-test names for client-side search.
    pub searching_text: String,

    /// Sign-off is tracked per allocation; at order level these are always false.
    pub first_sign_off: bool,
    pub second_sign_off: bool,

    pub collected: bool,
    pub collected_by: Option<CollectedBy>,
    pub accepted: bool,
    pub accepted_by: Option<UserRef>,

    /// Every status of every allocation, flattened in allocation order.
    pub allocation_statuses: Vec<StatusRecord>,

    /// One allocation per parameter, most recently active wins.
    pub test_allocations: Vec<AllocationView>,

    /// Every allocation with at least one result, keyed by parameter uuid.
    pub allocations_grouped_by_parameter_uuid: BTreeMap<String, Vec<AllocationView>>,
}

impl OrderView {
    /// True when at least one de-duplicated allocation carries a result.
    pub fn has_results(&self) -> bool {
        self.test_allocations
            .iter()
            .any(|allocation| !allocation.results.is_empty())
    }
}

/// The order proper, with its concept normalised.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailView {
    #[serde(flatten)]
    pub extra: Extra,

    pub uuid: Option<String>,
    pub concept: Option<OrderConceptView>,
}

/// The ordered test concept as shown in the UI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConceptView {
    #[serde(flatten)]
    pub extra: Extra,

    pub uuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// Display name without its department prefix.
    pub display: Option<String>,

    /// Sub-tests of the order, display names without department prefix.
    pub set_members: Vec<ConceptRecord>,

    pub answers: Vec<ConceptRecord>,

    /// Coded answers by uuid, for resolving coded result values.
    pub keyed_answers: BTreeMap<String, ConceptRecord>,
}

/// Who collected the sample, taken from the sample creator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CollectedBy {
    pub display: Option<String>,
    pub name: Option<String>,
    pub uid: Option<String>,
}

impl CollectedBy {
    pub fn from_creator(creator: &UserRef) -> Self {
        Self {
            display: person_name(creator.display.as_deref()),
            name: person_name(creator.display.as_deref()),
            uid: creator.uuid.clone(),
        }
    }
}

/// Sample-wide facts shared by every order of one build.
#[derive(Debug)]
pub(crate) struct OrderContext<'a> {
    pub departments: ReferenceIndex<'a>,
    pub specimen_sources: ReferenceIndex<'a>,
    pub collected_by: Option<CollectedBy>,
    pub accepted: bool,
    pub accepted_by: Option<UserRef>,
}

/// Enrich one raw order.
pub(crate) fn enrich_order(raw: &RawOrder, ctx: &OrderContext<'_>) -> OrderView {
    let concept_uuid = raw.concept_uuid();
    let department = ctx.departments.get(concept_uuid);
    let specimen_source = ctx.specimen_sources.get(concept_uuid);

    tracing::trace!(
        order = concept_uuid.unwrap_or_default(),
        allocations = raw.test_allocations.len(),
        department = department.is_some(),
        specimen_source = specimen_source.is_some(),
        "enriching order"
    );

    OrderView {
        extra: passthrough(&raw.extra, ORDER_VIEW_FIELDS),
        order: detail_view(raw.order.as_ref(), department, specimen_source),
        authorization_info: authorization_details_by_order(raw).cloned(),
        searching_text: searching_text(raw.concept(), specimen_source),
        first_sign_off: false,
        second_sign_off: false,
        collected: true,
        collected_by: ctx.collected_by.clone(),
        accepted: ctx.accepted,
        accepted_by: ctx.accepted_by.clone(),
        allocation_statuses: raw
            .test_allocations
            .iter()
            .flat_map(|allocation| allocation.statuses.iter().cloned())
            .collect(),
        test_allocations: dedup_by_parameter(&raw.test_allocations)
            .into_iter()
            .map(enrich_allocation)
            .collect(),
        allocations_grouped_by_parameter_uuid: group_by_parameter(&raw.test_allocations),
    }
}

fn detail_view(
    detail: Option<&OrderDetail>,
    department: Option<IndexedConcept<'_>>,
    specimen_source: Option<IndexedConcept<'_>>,
) -> OrderDetailView {
    let Some(detail) = detail else {
        return OrderDetailView::default();
    };

    OrderDetailView {
        extra: passthrough(&detail.extra, ORDER_DETAIL_FIELDS),
        uuid: detail.uuid.clone(),
        concept: detail
            .concept
            .as_ref()
            .map(|concept| concept_view(concept, department, specimen_source)),
    }
}

fn concept_view(
    concept: &ConceptRecord,
    department: Option<IndexedConcept<'_>>,
    specimen_source: Option<IndexedConcept<'_>>,
) -> OrderConceptView {
    let department_has_no_members =
        department.is_some_and(|found| found.concept.set_members.is_empty());

    let set_members = match specimen_source {
        Some(found) if !department_has_no_members => found
            .concept
            .set_members
            .iter()
            .map(|member| ConceptRecord {
                display: stripped_concept_display(member.display.as_deref()),
                ..member.clone()
            })
            .collect(),
        _ => Vec::new(),
    };

    let answers = match specimen_source {
        Some(found) => found.concept.answers.clone(),
        None => concept.answers.clone(),
    };

    let keyed_answers: BTreeMap<String, ConceptRecord> = specimen_source
        .map(|found| {
            found
                .concept
                .answers
                .iter()
                .filter_map(|answer| Some((answer.uuid.clone()?, answer.clone())))
                .collect()
        })
        .unwrap_or_default();

    // Fields of the specimen-source entry come first; the order's own fields override them.
    let mut extra = specimen_source
        .map(inherited_specimen_fields)
        .unwrap_or_default();
    extra.extend(passthrough(&concept.extra, ORDER_CONCEPT_FIELDS));

    OrderConceptView {
        extra,
        uuid: concept.uuid.clone(),
        uid: concept.uid.clone(),
        display: stripped_concept_display(concept.display.as_deref()),
        set_members,
        answers,
        keyed_answers,
    }
}

/// Reference fields of the specimen-source entry for a test order, with its listing parent.
fn inherited_specimen_fields(found: IndexedConcept<'_>) -> Extra {
    let mut inherited = passthrough(&found.concept.extra, ORDER_CONCEPT_FIELDS);
    inherited.remove(PARENT_FIELD);
    if let Some(parent) = found.parent_ref() {
        inherited.insert(PARENT_FIELD.to_string(), Value::Object(to_object(&parent)));
    }
    inherited
}

/// Lower-cased order display followed by the specimen-source sub-test names.
///
/// Raw display names are used so that searching by department prefix still matches.
fn searching_text(concept: Option<&ConceptRecord>, specimen_source: Option<IndexedConcept<'_>>) -> String {
    let order_display = concept.and_then(|concept| concept.display.as_deref());
    let member_displays = specimen_source
        .into_iter()
        .flat_map(|found| found.concept.set_members.iter())
        .map(|member| member.display.as_deref());

    std::iter::once(order_display)
        .chain(member_displays)
        .flatten()
        .map(|text| text.trim().to_lowercase())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keep one allocation per parameter uuid.
///
/// Walks the merged sequence; a later allocation replaces an earlier one with the same
/// parameter but takes over the earlier one's position. Allocations without a parameter uuid
/// share a single slot.
fn dedup_by_parameter(allocations: &[TestAllocation]) -> Vec<&TestAllocation> {
    let mut kept: Vec<&TestAllocation> = Vec::new();
    let mut slot_of: HashMap<Option<&str>, usize> = HashMap::new();

    for allocation in merge_test_allocations(allocations) {
        let parameter = allocation.parameter_uuid();
        match slot_of.get(&parameter).copied() {
            Some(slot) => kept[slot] = allocation,
            None => {
                slot_of.insert(parameter, kept.len());
                kept.push(allocation);
            }
        }
    }

    kept
}

/// Group every allocation that has results by parameter uuid, keeping input order.
fn group_by_parameter(allocations: &[TestAllocation]) -> BTreeMap<String, Vec<AllocationView>> {
    let mut groups: BTreeMap<String, Vec<AllocationView>> = BTreeMap::new();

    for allocation in allocations {
        if !allocation.has_results() {
            continue;
        }
        let Some(parameter) = allocation.parameter_uuid() else {
            tracing::warn!(
                allocation = allocation.uuid.as_deref().unwrap_or_default(),
                "allocation with results has no parameter concept; left out of grouping"
            );
            continue;
        };
        groups
            .entry(parameter.to_string())
            .or_default()
            .push(enrich_allocation(allocation));
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(value: serde_json::Value) -> ConceptRecord {
        serde_json::from_value(value).expect("concept should parse")
    }

    fn raw_order(value: serde_json::Value) -> RawOrder {
        serde_json::from_value(value).expect("order should parse")
    }

    fn context<'a>(departments: &'a [ConceptRecord], sources: &'a [ConceptRecord]) -> OrderContext<'a> {
        OrderContext {
            departments: ReferenceIndex::by_test_order(departments),
            specimen_sources: ReferenceIndex::by_test_order(sources),
            collected_by: None,
            accepted: false,
            accepted_by: None,
        }
    }

    fn specimen_sources() -> Vec<ConceptRecord> {
        vec![concept(serde_json::json!({
            "uuid": "src-serum",
            "display": "Serum",
            "setMembers": [{
                "uuid": "order-lft",
                "display": "Chemistry: LFT",
                "setMembers": [
                    {"uuid": "p-alt", "display": "Chemistry: ALT"},
                    {"uuid": "p-ast", "display": "AST"}
                ],
                "answers": [
                    {"uuid": "ans-pos", "display": "Positive"},
                    {"uuid": "ans-neg", "display": "Negative"}
                ]
            }]
        }))]
    }

    fn departments() -> Vec<ConceptRecord> {
        vec![concept(serde_json::json!({
            "uuid": "dep-chem",
            "display": "Chemistry",
            "setMembers": [{
                "uuid": "order-lft",
                "display": "Chemistry: LFT",
                "setMembers": [{"uuid": "p-alt"}, {"uuid": "p-ast"}]
            }]
        }))]
    }

    fn lft_order(allocations: serde_json::Value) -> RawOrder {
        raw_order(serde_json::json!({
            "order": {"uuid": "o1", "concept": {"uuid": "order-lft", "display": "Chemistry: LFT"}},
            "testAllocations": allocations
        }))
    }

    #[test]
    fn normalises_display_and_members() {
        let deps = departments();
        let sources = specimen_sources();
        let view = enrich_order(&lft_order(serde_json::json!([])), &context(&deps, &sources));

        let concept = view.order.concept.expect("concept");
        assert_eq!(concept.display.as_deref(), Some("LFT"));
        let members: Vec<_> = concept
            .set_members
            .iter()
            .filter_map(|m| m.display.as_deref())
            .collect();
        assert_eq!(members, vec!["ALT", "AST"]);
        assert_eq!(concept.keyed_answers.len(), 2);
        assert_eq!(
            concept.keyed_answers["ans-pos"].display.as_deref(),
            Some("Positive")
        );
    }

    #[test]
    fn department_without_members_empties_set_members() {
        let deps = vec![concept(serde_json::json!({
            "uuid": "dep-chem",
            "setMembers": [{"uuid": "order-lft", "display": "LFT"}]
        }))];
        let sources = specimen_sources();
        let view = enrich_order(&lft_order(serde_json::json!([])), &context(&deps, &sources));

        assert!(view.order.concept.expect("concept").set_members.is_empty());
    }

    #[test]
    fn no_specimen_source_means_no_members() {
        let view = enrich_order(&lft_order(serde_json::json!([])), &context(&[], &[]));
        let concept = view.order.concept.expect("concept");
        assert!(concept.set_members.is_empty());
        assert!(concept.keyed_answers.is_empty());
        assert_eq!(view.searching_text, "chemistry: lft");
    }

    #[test]
    fn searching_text_joins_order_and_member_names() {
        let sources = specimen_sources();
        let view = enrich_order(&lft_order(serde_json::json!([])), &context(&[], &sources));
        assert_eq!(view.searching_text, "chemistry: lft chemistry: alt ast");
    }

    #[test]
    fn order_level_flags_are_fixed() {
        let view = enrich_order(&lft_order(serde_json::json!([])), &context(&[], &[]));
        assert!(view.collected);
        assert!(!view.first_sign_off);
        assert!(!view.second_sign_off);
        assert!(view.authorization_info.is_none());
        assert!(!view.has_results());
    }

    #[test]
    fn later_allocation_for_a_parameter_wins() {
        let order = lft_order(serde_json::json!([
            {"uuid": "first", "concept": {"uuid": "p1"}, "statuses": [{"status": "REJECTED", "timestamp": 100}]},
            {"uuid": "other", "concept": {"uuid": "p2"}, "statuses": [{"timestamp": 150}]},
            {"uuid": "second", "concept": {"uuid": "p1"}, "statuses": [{"status": "APPROVED", "timestamp": 200}]}
        ]));
        let view = enrich_order(&order, &context(&[], &[]));

        let kept: Vec<_> = view
            .test_allocations
            .iter()
            .filter_map(|a| a.allocation_uuid.as_deref())
            .collect();
        assert_eq!(kept, vec!["second", "other"]);
        assert!(view.test_allocations[0].first_sign_off);
        assert!(!view.test_allocations[0].rejected);
    }

    #[test]
    fn dedup_without_timestamps_uses_input_order() {
        let order = lft_order(serde_json::json!([
            {"uuid": "first", "concept": {"uuid": "p1"}},
            {"uuid": "second", "concept": {"uuid": "p1"}}
        ]));
        let view = enrich_order(&order, &context(&[], &[]));
        assert_eq!(view.test_allocations.len(), 1);
        assert_eq!(
            view.test_allocations[0].allocation_uuid.as_deref(),
            Some("second")
        );
    }

    #[test]
    fn dedup_is_repeatable() {
        let order = lft_order(serde_json::json!([
            {"uuid": "a", "concept": {"uuid": "p1"}, "statuses": [{"timestamp": 5}]},
            {"uuid": "b", "concept": {"uuid": "p1"}, "statuses": [{"timestamp": 5}]},
            {"uuid": "c", "concept": {"uuid": "p2"}}
        ]));
        let ctx = context(&[], &[]);
        assert_eq!(
            enrich_order(&order, &ctx).test_allocations,
            enrich_order(&order, &ctx).test_allocations
        );
    }

    #[test]
    fn grouping_keeps_only_allocations_with_results() {
        let order = lft_order(serde_json::json!([
            {"uuid": "a1", "concept": {"uuid": "p1"}, "results": [{"valueNumeric": 1, "dateCreated": 10}]},
            {"uuid": "a2", "concept": {"uuid": "p1"}, "results": [{"valueNumeric": 2, "dateCreated": 20}]},
            {"uuid": "a3", "concept": {"uuid": "p2"}, "results": []},
            {"uuid": "a4", "results": [{"valueNumeric": 3}]}
        ]));
        let view = enrich_order(&order, &context(&[], &[]));

        assert_eq!(view.allocations_grouped_by_parameter_uuid.len(), 1);
        let group = &view.allocations_grouped_by_parameter_uuid["p1"];
        assert_eq!(group.len(), 2);
        assert!(group.iter().all(|allocation| !allocation.results.is_empty()));
        assert!(view.has_results());
    }

    #[test]
    fn grouping_keeps_input_order() {
        let order = lft_order(serde_json::json!([
            {"uuid": "a-late", "concept": {"uuid": "p1"}, "results": [{"valueNumeric": 2, "dateCreated": 200}]},
            {"uuid": "a-early", "concept": {"uuid": "p1"}, "results": [{"valueNumeric": 1, "dateCreated": 100}]}
        ]));
        let view = enrich_order(&order, &context(&[], &[]));

        let grouped: Vec<_> = view.allocations_grouped_by_parameter_uuid["p1"]
            .iter()
            .filter_map(|a| a.allocation_uuid.as_deref())
            .collect();
        assert_eq!(grouped, vec!["a-late", "a-early"]);
    }

    #[test]
    fn order_concept_inherits_specimen_entry_fields() {
        let sources = vec![concept(serde_json::json!({
            "uuid": "src-serum",
            "display": "Serum",
            "setMembers": [{
                "uuid": "order-lft",
                "display": "LFT",
                "container": "SST",
                "volume": "5ml",
                "answers": [{"uuid": "ans-pos"}]
            }]
        }))];
        let order = raw_order(serde_json::json!({
            "order": {"concept": {"uuid": "order-lft", "display": "LFT", "volume": "2ml"}}
        }));
        let view = enrich_order(&order, &context(&[], &sources));

        let json = serde_json::to_value(&view.order.concept).expect("serialise");
        assert_eq!(json["container"], "SST");
        assert_eq!(json["volume"], "2ml");
        assert_eq!(json["parent"]["uuid"], "src-serum");
        assert_eq!(json["parent"]["display"], "Serum");
        assert_eq!(json["answers"][0]["uuid"], "ans-pos");
    }

    #[test]
    fn order_concept_without_specimen_entry_has_no_parent() {
        let view = enrich_order(&lft_order(serde_json::json!([])), &context(&[], &[]));
        let json = serde_json::to_value(&view.order.concept).expect("serialise");
        assert!(json.get("parent").is_none());
    }

    #[test]
    fn allocation_statuses_are_flattened() {
        let order = lft_order(serde_json::json!([
            {"concept": {"uuid": "p1"}, "statuses": [{"uuid": "s1"}, {"uuid": "s2"}]},
            {"concept": {"uuid": "p2"}, "statuses": [{"uuid": "s3", "status": "APPROVED", "timestamp": 1}]}
        ]));
        let view = enrich_order(&order, &context(&[], &[]));

        assert_eq!(view.allocation_statuses.len(), 3);
        assert_eq!(
            view.authorization_info
                .as_ref()
                .and_then(|s| s.uuid.as_deref()),
            Some("s3")
        );
    }

    #[test]
    fn missing_order_detail_is_tolerated() {
        let view = enrich_order(&RawOrder::default(), &context(&[], &[]));
        assert!(view.order.concept.is_none());
        assert!(view.searching_text.is_empty());
        assert!(view.test_allocations.is_empty());
    }

    #[test]
    fn collected_by_drops_role_suffix() {
        let creator = UserRef {
            uuid: Some("u1".into()),
            display: Some("Jane Doe (Lab Tech)".into()),
            ..UserRef::default()
        };
        let collected_by = CollectedBy::from_creator(&creator);
        assert_eq!(collected_by.display.as_deref(), Some("Jane Doe"));
        assert_eq!(collected_by.name.as_deref(), Some("Jane Doe"));
        assert_eq!(collected_by.uid.as_deref(), Some("u1"));
    }

    #[test]
    fn serialises_camel_case_with_passthrough() {
        let order = raw_order(serde_json::json!({
            "order": {"uuid": "o1", "orderNumber": "ORD-7", "concept": {"uuid": "c1", "display": "X: Y"}},
            "priority": "STAT"
        }));
        let json = serde_json::to_value(enrich_order(&order, &context(&[], &[]))).expect("serialise");

        assert_eq!(json["priority"], "STAT");
        assert_eq!(json["order"]["orderNumber"], "ORD-7");
        assert_eq!(json["order"]["concept"]["display"], "Y");
        assert_eq!(json["collected"], true);
        assert!(json["allocationsGroupedByParameterUuid"].is_object());
        assert!(json["searchingText"].is_string());
    }
}
