//! Unit conversion registry.
//!
//! Conversions are pure scale factors keyed by an exact `(from, to)` unit
//! string pair. Registering a pair also registers its inverse, so a
//! `Mt -> Gt` conversion followed by `Gt -> Mt` restores the original
//! values up to floating-point rounding.

use std::collections::BTreeMap;

use snafu::prelude::*;

use crate::scenario_table::error::{InvalidConversionFactorSnafu, TableError, UnknownUnitSnafu};

/// Built-in conversions: `(from, to, factor)`.
const BUILTIN: &[(&str, &str, f64)] = &[
    ("Mt CO2/yr", "Gt CO2/yr", 1e-3),
    ("kt CO2/yr", "Mt CO2/yr", 1e-3),
    ("kt CO2/yr", "Gt CO2/yr", 1e-6),
    ("Mt CO2-equiv/yr", "Gt CO2-equiv/yr", 1e-3),
    ("Mt CO2e/yr", "Gt CO2e/yr", 1e-3),
    ("Mt CH4/yr", "kt CH4/yr", 1e3),
    ("kt N2O/yr", "Mt N2O/yr", 1e-3),
    ("EJ/yr", "PJ/yr", 1e3),
];

/// Registry of `(from, to) -> factor` conversions.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitRegistry {
    factors: BTreeMap<(String, String), f64>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl UnitRegistry {
    /// A registry with no conversions at all.
    pub fn empty() -> Self {
        UnitRegistry {
            factors: BTreeMap::new(),
        }
    }

    /// A registry preloaded with the built-in emission and energy
    /// conversions (e.g. `Mt CO2/yr -> Gt CO2/yr` is ÷1000).
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (from, to, factor) in BUILTIN {
            registry.insert_pair(from, to, *factor);
        }
        registry
    }

    /// Register `value_in_to = value_in_from * factor` and its inverse.
    ///
    /// Replaces any existing factor for the pair. Fails with
    /// [`TableError::InvalidConversionFactor`] for zero or non-finite
    /// factors (or factors whose inverse is not finite), and for
    /// `from == to` with a factor other than 1.
    pub fn register(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        factor: f64,
    ) -> Result<(), TableError> {
        let from = from.into();
        let to = to.into();
        ensure!(
            factor.is_finite()
                && factor != 0.0
                && factor.recip().is_finite()
                && (from != to || factor == 1.0),
            InvalidConversionFactorSnafu { from, to, factor }
        );
        self.insert_pair(&from, &to, factor);
        Ok(())
    }

    fn insert_pair(&mut self, from: &str, to: &str, factor: f64) {
        if from == to {
            return;
        }
        self.factors
            .insert((from.to_string(), to.to_string()), factor);
        self.factors
            .insert((to.to_string(), from.to_string()), factor.recip());
    }

    /// Scale factor for `from -> to`.
    ///
    /// Identical units convert with factor 1. Unregistered pairs fail with
    /// [`TableError::UnknownUnit`].
    pub fn factor(&self, from: &str, to: &str) -> Result<f64, TableError> {
        if from == to {
            return Ok(1.0);
        }
        self.factors
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .context(UnknownUnitSnafu { from, to })
    }

    /// True when `from -> to` can be converted.
    pub fn contains(&self, from: &str, to: &str) -> bool {
        self.factor(from, to).is_ok()
    }

    /// Registered pairs (including inverses) in sorted order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.factors
            .iter()
            .map(|((from, to), factor)| (from.as_str(), to.as_str(), *factor))
    }

    /// Number of registered directed pairs.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// True when no pairs are registered.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}
