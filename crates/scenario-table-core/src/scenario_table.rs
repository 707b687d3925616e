//! In-memory long-format scenario table.
//!
//! A [`ScenarioTable`] owns a list of [`Observation`] rows with unique
//! natural keys, plus shared handles to the run metadata and the unit
//! registry used for conversions. Transforms (`filter`, `convert_unit`,
//! `append_block`) either return a new table that shares those handles or
//! mutate the receiver in place; every transform is all-or-nothing, so a
//! failed in-place call leaves the table unchanged.
//!
//! Submodules:
//! - `filter`: predicate filtering and exclusion,
//! - `convert`: unit conversion,
//! - `append`: appending external reference blocks,
//! - `group`: grouping rows into labeled series for rendering,
//! - `export`: Arrow record batch export.

pub mod append;
pub mod convert;
pub mod error;
pub mod export;
pub mod filter;
pub mod group;

#[cfg(test)]
pub(crate) mod test_util;

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use snafu::prelude::*;

use crate::{
    metadata::RunMetadata,
    observation::{Observation, ObservationKey, RunKey},
    units::UnitRegistry,
};

pub use append::{AppendSpec, ExternalBlock, RegionLabel};
pub use group::{Series, YearRange};

use error::{KeyConflictSnafu, TableError};

/// Long-format table of scenario observations with shared run metadata.
#[derive(Debug, Clone)]
pub struct ScenarioTable {
    rows: Vec<Observation>,
    keys: HashSet<ObservationKey>,
    metadata: Arc<RunMetadata>,
    units: Arc<UnitRegistry>,
}

impl Default for ScenarioTable {
    fn default() -> Self {
        Self::new(RunMetadata::new())
    }
}

impl ScenarioTable {
    /// An empty table with the given metadata and the built-in unit registry.
    pub fn new(metadata: RunMetadata) -> Self {
        ScenarioTable {
            rows: Vec::new(),
            keys: HashSet::new(),
            metadata: Arc::new(metadata),
            units: Arc::new(UnitRegistry::builtin()),
        }
    }

    /// Build a table from rows, rejecting duplicate keys with
    /// [`TableError::KeyConflict`].
    pub fn from_observations<I>(rows: I, metadata: RunMetadata) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut table = Self::new(metadata);
        table.extend(rows)?;
        Ok(table)
    }

    /// Replace the run metadata.
    pub fn with_metadata(mut self, metadata: RunMetadata) -> Self {
        self.metadata = Arc::new(metadata);
        self
    }

    /// Replace the unit registry used by [`ScenarioTable::convert_unit`].
    pub fn with_unit_registry(mut self, units: UnitRegistry) -> Self {
        self.units = Arc::new(units);
        self
    }

    /// Run metadata shared by this table and every table derived from it.
    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    /// Unit registry used for conversions.
    pub fn unit_registry(&self) -> &UnitRegistry {
        &self.units
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    /// Iterate rows in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.rows.iter()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when a row with `key` exists.
    pub fn contains_key(&self, key: &ObservationKey) -> bool {
        self.keys.contains(key)
    }

    /// Add one row. Fails with [`TableError::KeyConflict`] on a duplicate key.
    pub fn push(&mut self, obs: Observation) -> Result<(), TableError> {
        let key = obs.key();
        ensure!(!self.keys.contains(&key), KeyConflictSnafu { key });
        self.keys.insert(key);
        self.rows.push(obs);
        Ok(())
    }

    /// Add many rows atomically: on a key conflict nothing is added.
    pub fn extend<I>(&mut self, rows: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = Observation>,
    {
        let rows: Vec<Observation> = rows.into_iter().collect();
        let mut fresh = HashSet::with_capacity(rows.len());
        for obs in &rows {
            let key = obs.key();
            ensure!(
                !self.keys.contains(&key) && !fresh.contains(&key),
                KeyConflictSnafu { key }
            );
            fresh.insert(key);
        }

        self.keys.extend(fresh);
        self.rows.extend(rows);
        Ok(())
    }

    /// Concatenate `other`'s rows after this table's rows.
    ///
    /// Metadata of both tables is merged (this table's values win); the
    /// unit registry of `self` is kept.
    pub fn concat(&self, other: &ScenarioTable) -> Result<ScenarioTable, TableError> {
        let mut out = self.clone();
        out.extend(other.rows.iter().cloned())?;
        if !Arc::ptr_eq(&self.metadata, &other.metadata) {
            let mut merged = (*self.metadata).clone();
            merged.merge(&other.metadata);
            out.metadata = Arc::new(merged);
        }
        Ok(out)
    }

    /// Derive a table from rows known to have unique keys, sharing this
    /// table's metadata and unit registry.
    pub(crate) fn derive(&self, rows: Vec<Observation>) -> ScenarioTable {
        let keys = rows.iter().map(Observation::key).collect();
        ScenarioTable {
            rows,
            keys,
            metadata: Arc::clone(&self.metadata),
            units: Arc::clone(&self.units),
        }
    }

    /// Replace rows and rebuild the key index. Caller guarantees uniqueness.
    pub(crate) fn replace_rows(&mut self, rows: Vec<Observation>) {
        self.keys = rows.iter().map(Observation::key).collect();
        self.rows = rows;
    }

    /// Distinct model names.
    pub fn models(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|o| o.model.as_str()).collect()
    }

    /// Distinct scenario names.
    pub fn scenarios(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|o| o.scenario.as_str()).collect()
    }

    /// Distinct region labels.
    pub fn regions(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|o| o.region.as_str()).collect()
    }

    /// Distinct variable names.
    pub fn variables(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|o| o.variable.as_str()).collect()
    }

    /// Distinct units.
    pub fn units(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|o| o.unit.as_str()).collect()
    }

    /// Distinct years.
    pub fn years(&self) -> BTreeSet<i32> {
        self.rows.iter().map(|o| o.year).collect()
    }

    /// Distinct `(model, scenario)` runs.
    pub fn runs(&self) -> BTreeSet<RunKey> {
        self.rows.iter().map(Observation::run).collect()
    }

    /// Runs present in the table that have no metadata entry.
    pub fn runs_without_metadata(&self) -> BTreeSet<RunKey> {
        self.rows
            .iter()
            .filter(|o| !self.metadata.contains_run(&o.model, &o.scenario))
            .map(Observation::run)
            .collect()
    }
}

impl<'a> IntoIterator for &'a ScenarioTable {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use crate::metadata::CATEGORY;

    #[test]
    fn duplicate_keys_are_rejected() {
        let row = co2("M1", "S1", 2020, 1.0);
        let err = ScenarioTable::from_observations([row.clone(), row], RunMetadata::new())
            .expect_err("duplicate");
        assert!(matches!(err, TableError::KeyConflict { .. }));
    }

    #[test]
    fn extend_is_atomic() -> TestResult {
        let mut table = sample_table()?;
        let before = table.len();
        let err = table
            .extend([co2("M9", "S9", 2020, 1.0), co2("M1", "S1", 2020, 5.0)])
            .expect_err("second row collides");
        assert!(matches!(err, TableError::KeyConflict { .. }));
        assert_eq!(table.len(), before);
        assert!(!table.models().contains("M9"));
        Ok(())
    }

    #[test]
    fn distinct_accessors() -> TestResult {
        let table = sample_table()?;
        assert_eq!(table.models().into_iter().collect::<Vec<_>>(), vec!["M1", "M2", "M3"]);
        assert_eq!(table.years().into_iter().collect::<Vec<_>>(), vec![2020, 2030, 2050]);
        assert_eq!(table.runs().len(), 4);
        assert_eq!(
            table.runs_without_metadata().into_iter().collect::<Vec<_>>(),
            vec![RunKey::new("M3", "S1")]
        );
        Ok(())
    }

    #[test]
    fn concat_merges_metadata() -> TestResult {
        let left = sample_table()?;
        let mut meta = RunMetadata::new();
        meta.set_category(RunKey::new("M3", "S1"), "Lower 2C");
        let right =
            ScenarioTable::from_observations([co2("M3", "S1", 2100, -2000.0)], meta)?;

        let both = left.concat(&right)?;
        assert_eq!(both.len(), left.len() + 1);
        assert_eq!(both.metadata().get("M3", "S1", CATEGORY), Some("Lower 2C"));
        assert!(both.runs_without_metadata().is_empty());

        let err = both.concat(&right).expect_err("same rows twice");
        assert!(matches!(err, TableError::KeyConflict { .. }));
        Ok(())
    }
}
