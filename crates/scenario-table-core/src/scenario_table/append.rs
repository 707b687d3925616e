//! Appending external reference blocks to a `ScenarioTable`.
//!
//! Reference curves (for example a digitized IEA pathway) arrive as a small
//! rectangular block: one labeled row of values under year column labels.
//! The block carries no model/scenario/variable/unit of its own, so the
//! caller supplies them through an [`AppendSpec`].
//!
//! The `region` of every emitted row comes from [`RegionLabel`]. The
//! default, [`RegionLabel::IndexName`], stores the block's index name rather
//! than a geographic region. That matches how the 1.5°C comparison pipeline
//! tags its global reference series and is kept so exported tables line up
//! with that pipeline's output.

use std::collections::BTreeSet;

use log::debug;
use snafu::prelude::*;

use crate::{
    observation::Observation,
    scenario_table::{
        ScenarioTable,
        error::{ShapeSnafu, TableError},
    },
};

/// Rectangular block of external values indexed by year columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalBlock {
    /// Name of the row-label axis (the block's index name).
    pub index_name: String,
    /// One label per data row.
    pub row_labels: Vec<String>,
    /// Column labels.
    pub years: Vec<i32>,
    /// Row-major values, `values[row][column]`.
    pub values: Vec<Vec<f64>>,
}

impl ExternalBlock {
    /// A single-row block from `(year, value)` points.
    pub fn series<I>(index_name: impl Into<String>, label: impl Into<String>, points: I) -> Self
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        let (years, row): (Vec<i32>, Vec<f64>) = points.into_iter().unzip();
        ExternalBlock {
            index_name: index_name.into(),
            row_labels: vec![label.into()],
            years,
            values: vec![row],
        }
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.values.len(), self.years.len())
    }

    /// The single data row as `(label, values)`, or a [`TableError::Shape`]
    /// explaining why the block is not one-dimensional.
    fn single_row(&self) -> Result<(&str, &[f64]), TableError> {
        ensure!(
            self.row_labels.len() == self.values.len(),
            ShapeSnafu {
                reason: format!(
                    "{} row label(s) for {} data row(s)",
                    self.row_labels.len(),
                    self.values.len()
                ),
            }
        );

        let (label, row) = match (self.row_labels.as_slice(), self.values.as_slice()) {
            ([label], [row]) => (label.as_str(), row.as_slice()),
            _ => {
                return ShapeSnafu {
                    reason: format!(
                        "expected exactly one data row under '{}', found {}",
                        self.index_name,
                        self.values.len()
                    ),
                }
                .fail();
            }
        };

        ensure!(
            row.len() == self.years.len(),
            ShapeSnafu {
                reason: format!(
                    "row '{label}' has {} value(s) for {} year column(s)",
                    row.len(),
                    self.years.len()
                ),
            }
        );

        let mut seen = BTreeSet::new();
        if let Some(dup) = self.years.iter().find(|y| !seen.insert(**y)) {
            return ShapeSnafu {
                reason: format!("year column {dup} appears more than once"),
            }
            .fail();
        }

        Ok((label, row))
    }
}

/// Where appended rows take their `region` from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RegionLabel {
    /// The block's index name.
    #[default]
    IndexName,
    /// The label of the block's single data row.
    RowLabel,
    /// A fixed caller-given region.
    Fixed(String),
}

/// Field values for rows emitted from an [`ExternalBlock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendSpec {
    /// Model name for every emitted row.
    pub model: String,
    /// Scenario name for every emitted row.
    pub scenario: String,
    /// Variable name for every emitted row.
    pub variable: String,
    /// Unit for every emitted row.
    pub unit: String,
    /// Region source.
    pub region: RegionLabel,
}

impl AppendSpec {
    /// Spec with the default [`RegionLabel::IndexName`] region.
    pub fn new(
        model: impl Into<String>,
        scenario: impl Into<String>,
        variable: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        AppendSpec {
            model: model.into(),
            scenario: scenario.into(),
            variable: variable.into(),
            unit: unit.into(),
            region: RegionLabel::default(),
        }
    }

    /// Override the region source.
    pub fn with_region(mut self, region: RegionLabel) -> Self {
        self.region = region;
        self
    }

    fn observations(&self, block: &ExternalBlock) -> Result<Vec<Observation>, TableError> {
        let (label, row) = block.single_row()?;
        let region = match &self.region {
            RegionLabel::IndexName => block.index_name.as_str(),
            RegionLabel::RowLabel => label,
            RegionLabel::Fixed(region) => region.as_str(),
        };

        Ok(block
            .years
            .iter()
            .zip(row)
            .map(|(year, value)| {
                Observation::new(
                    &self.model,
                    &self.scenario,
                    region,
                    &self.variable,
                    &self.unit,
                    *year,
                    *value,
                )
            })
            .collect())
    }
}

impl ScenarioTable {
    /// Return a copy with one row per column of `block` appended.
    pub fn append_block(
        &self,
        block: &ExternalBlock,
        spec: &AppendSpec,
    ) -> Result<ScenarioTable, TableError> {
        let mut out = self.clone();
        out.append_block_inplace(block, spec)?;
        Ok(out)
    }

    /// In-place variant of [`ScenarioTable::append_block`]. Nothing is
    /// appended when the block is malformed or any row collides.
    pub fn append_block_inplace(
        &mut self,
        block: &ExternalBlock,
        spec: &AppendSpec,
    ) -> Result<(), TableError> {
        let rows = spec.observations(block)?;
        let count = rows.len();
        self.extend(rows)?;
        debug!(
            "appended {count} row(s) for {}/{} ({})",
            spec.model, spec.scenario, spec.variable
        );
        Ok(())
    }
}
