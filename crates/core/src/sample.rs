//! Sample view assembly.
//!
//! [`SampleViewBuilder::build`] is the entry point of the crate: it indexes the reference tables
//! once, enriches every order against them and derives the sample-level fields, producing one
//! flat, serialisable [`SampleView`]. Building never fails; anything missing in the input shows
//! up as `None` or an empty list in the view.

use crate::config::ViewConfig;
use crate::dates::format_status_date;
use crate::helpers::{format_user_changed_status, passthrough, status_instant, to_object};
use crate::lookup::{KeyedConcept, ReferenceIndex};
use crate::order::{enrich_order, CollectedBy, OrderContext, OrderView};
use crate::{ViewError, ViewResult};
use lab_model::status::{ACCEPTED, REJECTED, RELEASED, RESTRICTED, RESULTS_INTEGRATION};
use lab_model::{ConceptRecord, Extra, Patient, RawSample, StatusRecord, Timestamp, UserRef};
use serde::Serialize;
use std::sync::Arc;

const SAMPLE_VIEW_FIELDS: &[&str] = &[
    "uuid",
    "id",
    "label",
    "orders",
    "ordersWithResults",
    "statuses",
    "patient",
    "voided",
    "dateCreated",
    "creator",
    "registeredBy",
    "mrn",
    "department",
    "specimen",
    "collected",
    "integrationStatus",
    "releasedStatuses",
    "restrictedStatuses",
    "reasonsForRejection",
    "rejected",
    "rejectedBy",
];

/// A sample ready for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleView {
    #[serde(flatten)]
    pub extra: Extra,

    pub uuid: Option<String>,
    pub id: Option<String>,
    pub label: Option<String>,

    pub orders: Vec<OrderView>,

    /// Orders with at least one de-duplicated allocation that has a result.
    pub orders_with_results: Vec<OrderView>,

    pub statuses: Vec<StatusRecord>,
    pub patient: Option<Patient>,
    pub voided: Option<bool>,
    pub date_created: Option<Timestamp>,
    pub creator: Option<UserRef>,
    pub registered_by: Option<UserRef>,
    pub mrn: Option<String>,

    pub department: Option<KeyedConcept>,
    pub specimen: Option<KeyedConcept>,

    pub collected: bool,
    pub integration_status: Option<StatusRecord>,
    pub released_statuses: Vec<DatedStatus>,
    pub restricted_statuses: Vec<DatedStatus>,
    pub reasons_for_rejection: Vec<RejectionReason>,
    pub rejected: bool,

    /// The rejecting user merged with the rejection status; status fields win.
    pub rejected_by: Option<Extra>,
}

impl SampleView {
    /// Serialise the view to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Serialization`] if serialisation fails.
    pub fn to_json(&self, pretty: bool) -> ViewResult<String> {
        let rendered = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        rendered.map_err(ViewError::Serialization)
    }
}

/// A status with a human-readable date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatedStatus {
    #[serde(flatten)]
    pub status: StatusRecord,

    /// `"<date> <HH:MM> ( <relative time> )"`, or `None` when the timestamp is unreadable.
    pub date: Option<String>,
}

/// A rejection reason resolved through the rejection-reason table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RejectionReason {
    /// The reason code, as recorded in the status.
    pub uuid: Option<String>,
    pub display: Option<String>,
}

/// Builds [`SampleView`]s.
///
/// Holds only configuration, so one builder can serve any number of samples and can be shared
/// across threads.
#[derive(Clone, Debug, Default)]
pub struct SampleViewBuilder {
    cfg: Arc<ViewConfig>,
}

impl SampleViewBuilder {
    /// Creates a new `SampleViewBuilder`.
    ///
    /// # Arguments
    ///
    /// * `cfg` - View configuration resolved at startup.
    pub fn new(cfg: Arc<ViewConfig>) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.cfg
    }

    /// Build the display view of `sample`.
    ///
    /// The three reference tables are indexed once per call. Inputs are only borrowed, and the
    /// same inputs always give the same view.
    ///
    /// # Arguments
    ///
    /// * `sample` - The raw sample with its orders.
    /// * `departments` - Department reference entries, each listing its test orders.
    /// * `specimen_sources` - Specimen-source reference entries, each listing its test orders.
    /// * `rejection_reasons` - Coded rejection reasons, keyed by uuid.
    pub fn build(
        &self,
        sample: &RawSample,
        departments: &[ConceptRecord],
        specimen_sources: &[ConceptRecord],
        rejection_reasons: &[ConceptRecord],
    ) -> SampleView {
        let department_index = ReferenceIndex::by_test_order(departments);
        let specimen_index = ReferenceIndex::by_test_order(specimen_sources);
        let rejection_index = ReferenceIndex::by_uuid(rejection_reasons);

        let sample_key = sample
            .concept
            .as_ref()
            .and_then(|concept| self.cfg.sample_concept_key().key_of(concept));
        let department = department_index.get(sample_key).map(|found| found.to_keyed());
        let specimen = specimen_index.get(sample_key).map(|found| found.to_keyed());

        tracing::debug!(
            sample = sample.uuid.as_deref().unwrap_or_default(),
            key = sample_key.unwrap_or_default(),
            department = department
                .as_ref()
                .and_then(|d| d.concept.display.as_deref())
                .unwrap_or_default(),
            specimen = specimen
                .as_ref()
                .and_then(|s| s.concept.display.as_deref())
                .unwrap_or_default(),
            "resolved sample classification"
        );

        let first_acceptance = sample.statuses.iter().find(|status| status.status_is(ACCEPTED));
        let ctx = OrderContext {
            departments: department_index,
            specimen_sources: specimen_index,
            collected_by: sample.creator.as_ref().map(CollectedBy::from_creator),
            accepted: first_acceptance.is_some(),
            accepted_by: format_user_changed_status(first_acceptance),
        };

        let orders: Vec<OrderView> = sample
            .orders
            .iter()
            .map(|order| enrich_order(order, &ctx))
            .collect();
        let orders_with_results: Vec<OrderView> = orders
            .iter()
            .filter(|order| order.has_results())
            .cloned()
            .collect();

        let first_rejection = sample
            .statuses
            .iter()
            .find(|status| status.category_contains(REJECTED));
        let reasons_for_rejection = reasons_for_rejection(&sample.statuses, &rejection_index);

        tracing::debug!(
            sample = sample.uuid.as_deref().unwrap_or_default(),
            orders = orders.len(),
            orders_with_results = orders_with_results.len(),
            statuses = sample.statuses.len(),
            rejections = reasons_for_rejection.len(),
            "built sample view"
        );

        SampleView {
            extra: passthrough(&sample.extra, SAMPLE_VIEW_FIELDS),
            uuid: sample.uuid.clone(),
            id: sample.uuid.clone(),
            label: sample.label.clone(),
            orders,
            orders_with_results,
            statuses: sample.statuses.clone(),
            patient: sample.patient.clone(),
            voided: sample.voided,
            date_created: sample.date_created.clone(),
            creator: sample.creator.clone(),
            registered_by: sample.creator.clone(),
            mrn: medical_record_number(sample.patient.as_ref()),
            department,
            specimen,
            collected: true,
            integration_status: sample
                .statuses
                .iter()
                .find(|status| status.category_is(RESULTS_INTEGRATION))
                .cloned(),
            released_statuses: dated_statuses(&sample.statuses, RELEASED, &self.cfg),
            restricted_statuses: dated_statuses(&sample.statuses, RESTRICTED, &self.cfg),
            reasons_for_rejection,
            rejected: first_rejection.is_some(),
            rejected_by: first_rejection.map(rejected_by),
        }
    }
}

fn dated_statuses(statuses: &[StatusRecord], kind: &str, cfg: &ViewConfig) -> Vec<DatedStatus> {
    statuses
        .iter()
        .filter(|status| status.status_is(kind))
        .map(|status| {
            let mut status_record = status.clone();
            status_record.extra.remove("date");
            DatedStatus {
                date: status_instant(status).map(|instant| format_status_date(instant, cfg)),
                status: status_record,
            }
        })
        .collect()
}

fn reasons_for_rejection(
    statuses: &[StatusRecord],
    rejection_index: &ReferenceIndex<'_>,
) -> Vec<RejectionReason> {
    statuses
        .iter()
        .filter(|status| status.category_contains(REJECTED))
        .map(|status| {
            let code = status.status.as_deref();
            let reason = rejection_index.get(code);
            if reason.is_none() {
                tracing::warn!(
                    code = code.unwrap_or_default(),
                    "rejection reason code not found in reference table"
                );
            }
            RejectionReason {
                uuid: code.map(str::to_string),
                display: reason.and_then(|found| found.concept.display.clone()),
            }
        })
        .collect()
}

fn rejected_by(status: &StatusRecord) -> Extra {
    let mut merged = format_user_changed_status(Some(status))
        .map(|user| to_object(&user))
        .unwrap_or_default();
    merged.extend(to_object(status));
    merged
}

fn medical_record_number(patient: Option<&Patient>) -> Option<String> {
    let identifier = patient?.identifiers.first()?;
    identifier
        .id
        .clone()
        .or_else(|| identifier.identifier.clone())
}
