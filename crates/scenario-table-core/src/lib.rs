//! Core engine for filtering and reshaping IAMC scenario ensembles.
//!
//! This crate provides the pieces behind `scenario-table`:
//!
//! - A long-format observation table keyed by
//!   `(model, scenario, region, variable, unit, year)` with a shared,
//!   per-run metadata side table (`scenario_table` module).
//! - A closed set of typed filter predicates (equality, set membership,
//!   AND, NOT) that resolve against row fields or run metadata
//!   (`predicate` module).
//! - A unit conversion registry with built-in emission factors
//!   (`units` module).
//! - YAML-backed configuration for plotting run control and extra unit
//!   conversions (`config` module).
//! - CSV loaders for scenario data, run metadata, and digitized reference
//!   blocks (`io` module).
//!
//! Rendering is left to callers; the table exposes grouped series and
//! per-year envelopes that a plotting layer can style with a
//! [`config::RunControl`].
#![deny(missing_docs)]

pub mod config;
pub mod io;
pub mod metadata;
pub mod observation;
pub mod predicate;
pub mod scenario_table;
pub mod units;

pub use metadata::{CATEGORY, RunMetadata};
pub use observation::{Observation, ObservationKey, RunKey};
pub use predicate::{Predicate, PredicateValue};
pub use scenario_table::{
    AppendSpec, ExternalBlock, RegionLabel, ScenarioTable, Series, YearRange, error::TableError,
};
pub use units::UnitRegistry;
