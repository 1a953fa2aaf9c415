//! # Labview Core
//!
//! Core view-model logic for laboratory samples.
//!
//! This crate turns a raw sample aggregate (orders, test allocations, statuses, results) plus
//! three reference tables (departments, specimen sources, rejection reasons) into one flat,
//! display-ready [`SampleView`]:
//! - reference tables indexed once per build
//! - per-order enrichment: normalised names, search text, de-duplicated and grouped allocations
//! - per-allocation sign-off and rejection state
//! - sample-level acceptance, rejection and release information with readable dates
//!
//! Building is pure and never fails. Fallible work (configuration, reading input files,
//! rendering JSON) reports a [`ViewError`].
//!
//! **No I/O in the builder**: loading files lives in [`bundle`], and environment handling
//! belongs to binaries such as `labview-cli`.

pub mod allocation;
pub mod bundle;
pub mod config;
pub mod constants;
pub mod dates;
pub mod display;
pub mod error;
pub mod helpers;
pub mod lookup;
pub mod order;
pub mod sample;

pub use allocation::{enrich_allocation, AllocationView, SignOffState};
pub use bundle::{load_reference_table, load_reference_table_opt, load_sample, InputFormat};
pub use config::{ConceptKey, ViewConfig};
pub use error::{ViewError, ViewResult};
pub use helpers::{FormattedResult, ResultsCommentsStatuses};
pub use lookup::{KeyedConcept, ParentRef, ReferenceIndex};
pub use order::{CollectedBy, OrderConceptView, OrderDetailView, OrderView};
pub use sample::{DatedStatus, RejectionReason, SampleView, SampleViewBuilder};
