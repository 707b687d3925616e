//! Row types for the long-format observation table.
//!
//! An [`Observation`] is one `(model, scenario, region, variable, unit,
//! year) -> value` fact. The first six fields form the natural
//! [`ObservationKey`]; the `(model, scenario)` pair is the [`RunKey`] used
//! to join rows against run metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single scenario data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Integrated assessment model name.
    pub model: String,
    /// Scenario name within the model.
    pub scenario: String,
    /// Region label (usually a geographic region such as `World`).
    pub region: String,
    /// Pipe-separated variable name, e.g. `Emissions|CO2`.
    pub variable: String,
    /// Unit string, matched exactly during unit conversion.
    pub unit: String,
    /// Calendar year.
    pub year: i32,
    /// Observed or projected value.
    pub value: f64,
}

impl Observation {
    /// Build an observation from its seven fields.
    pub fn new(
        model: impl Into<String>,
        scenario: impl Into<String>,
        region: impl Into<String>,
        variable: impl Into<String>,
        unit: impl Into<String>,
        year: i32,
        value: f64,
    ) -> Self {
        Observation {
            model: model.into(),
            scenario: scenario.into(),
            region: region.into(),
            variable: variable.into(),
            unit: unit.into(),
            year,
            value,
        }
    }

    /// Natural key of this observation (everything except `value`).
    pub fn key(&self) -> ObservationKey {
        ObservationKey {
            model: self.model.clone(),
            scenario: self.scenario.clone(),
            region: self.region.clone(),
            variable: self.variable.clone(),
            unit: self.unit.clone(),
            year: self.year,
        }
    }

    /// The `(model, scenario)` run this observation belongs to.
    pub fn run(&self) -> RunKey {
        RunKey::new(&self.model, &self.scenario)
    }
}

/// Natural key of an [`Observation`]. At most one row per key is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationKey {
    /// Model name.
    pub model: String,
    /// Scenario name.
    pub scenario: String,
    /// Region label.
    pub region: String,
    /// Variable name.
    pub variable: String,
    /// Unit string.
    pub unit: String,
    /// Calendar year.
    pub year: i32,
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/{}",
            self.model, self.scenario, self.region, self.variable, self.unit, self.year
        )
    }
}

/// Identity of a model run, the join key for run metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunKey {
    /// Model name.
    pub model: String,
    /// Scenario name.
    pub scenario: String,
}

impl RunKey {
    /// Build a run key from a model and scenario name.
    pub fn new(model: impl Into<String>, scenario: impl Into<String>) -> Self {
        RunKey {
            model: model.into(),
            scenario: scenario.into(),
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model, self.scenario)
    }
}
