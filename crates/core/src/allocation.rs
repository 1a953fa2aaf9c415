//! Allocation enrichment.
//!
//! Everything here is derived from one allocation's own statuses and results. Statuses are
//! ordered most recent first and the sign-off and rejection flags read the head of that order.

use crate::helpers::{
    format_results, passthrough, results_comments_statuses, statuses_most_recent_first,
    FormattedResult, ResultsCommentsStatuses,
};
use lab_model::status::{APPROVED, AUTHORIZED, REJECTED};
use lab_model::{ConceptRecord, Extra, StatusRecord, TestAllocation};
use serde::Serialize;

/// Keys an [`AllocationView`] sets itself; backend fields with these names are not passed through.
const ALLOCATION_VIEW_FIELDS: &[&str] = &[
    "uuid",
    "allocationUuid",
    "parameterUuid",
    "concept",
    "authorizationInfo",
    "firstSignOff",
    "secondSignOff",
    "rejected",
    "rejectionStatus",
    "results",
    "statuses",
    "resultsCommentsStatuses",
];

/// A test allocation enriched for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationView {
    #[serde(flatten)]
    pub extra: Extra,

    pub uuid: Option<String>,
    pub allocation_uuid: Option<String>,
    pub parameter_uuid: Option<String>,
    pub concept: Option<ConceptRecord>,

    /// The most recent status, when it is an approval.
    pub authorization_info: Option<StatusRecord>,
    pub first_sign_off: bool,
    pub second_sign_off: bool,
    pub rejected: bool,
    pub rejection_status: Option<StatusRecord>,

    pub results: Vec<FormattedResult>,

    /// Statuses in the order the backend sent them.
    pub statuses: Vec<StatusRecord>,
    pub results_comments_statuses: ResultsCommentsStatuses,
}

/// Sign-off and rejection facts read from an allocation's status history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignOffState {
    pub first_sign_off: bool,
    pub second_sign_off: bool,
    pub rejected: bool,
    pub rejection_status: Option<StatusRecord>,
    pub authorization_info: Option<StatusRecord>,
}

impl SignOffState {
    /// Derive sign-off state from a status history in any order.
    ///
    /// - first sign-off: the most recent status is APPROVED or AUTHORIZED
    /// - second sign-off: the two most recent statuses are both APPROVED (AUTHORIZED does not
    ///   count as the earlier approval)
    /// - rejected: the most recent status is REJECTED by status or category
    /// - rejection status: the most recent status, when its `status` is REJECTED
    /// - authorization info: the most recent status, when it is APPROVED by status or category
    ///
    /// An empty history yields the default: everything false or absent.
    pub fn from_statuses(statuses: &[StatusRecord]) -> Self {
        let ordered = statuses_most_recent_first(statuses);
        let Some(latest) = ordered.first().copied() else {
            return Self::default();
        };
        let previous = ordered.get(1).copied();

        let rejected = latest.is_kind(REJECTED);

        Self {
            first_sign_off: latest.status_is(APPROVED) || latest.status_is(AUTHORIZED),
            second_sign_off: latest.status_is(APPROVED)
                && previous.is_some_and(|status| status.status_is(APPROVED)),
            rejected,
            rejection_status: latest.status_is(REJECTED).then(|| latest.clone()),
            authorization_info: latest.is_kind(APPROVED).then(|| latest.clone()),
        }
    }
}

/// Enrich one allocation for display.
pub fn enrich_allocation(allocation: &TestAllocation) -> AllocationView {
    let sign_off = SignOffState::from_statuses(&allocation.statuses);

    AllocationView {
        extra: passthrough(&allocation.extra, ALLOCATION_VIEW_FIELDS),
        uuid: allocation.uuid.clone(),
        allocation_uuid: allocation.uuid.clone(),
        parameter_uuid: allocation.parameter_uuid().map(str::to_string),
        concept: allocation.concept.clone(),
        authorization_info: sign_off.authorization_info,
        first_sign_off: sign_off.first_sign_off,
        second_sign_off: sign_off.second_sign_off,
        rejected: sign_off.rejected,
        rejection_status: sign_off.rejection_status,
        results: format_results(&allocation.results),
        statuses: allocation.statuses.clone(),
        results_comments_statuses: results_comments_statuses(&allocation.statuses),
    }
}
