//! Unit conversion for `ScenarioTable`.
//!
//! Conversion is selective: only rows whose `unit` equals `from` exactly
//! (case-sensitive) are rescaled and relabeled; every other row is left
//! untouched. Row count and all key fields other than `unit` are preserved.

use log::debug;
use snafu::prelude::*;

use crate::scenario_table::{
    ScenarioTable,
    error::{InvalidConversionFactorSnafu, KeyConflictSnafu, TableError},
};

impl ScenarioTable {
    /// Return a copy with `from` rows converted to `to` using the table's
    /// unit registry.
    ///
    /// Fails with [`TableError::UnknownUnit`] when the pair is not
    /// registered, even if no row carries `from`.
    pub fn convert_unit(&self, from: &str, to: &str) -> Result<ScenarioTable, TableError> {
        let mut out = self.clone();
        out.convert_unit_inplace(from, to)?;
        Ok(out)
    }

    /// In-place variant of [`ScenarioTable::convert_unit`].
    pub fn convert_unit_inplace(&mut self, from: &str, to: &str) -> Result<(), TableError> {
        let factor = self.unit_registry().factor(from, to)?;
        self.rescale_inplace(from, to, factor)
    }

    /// Convert with an explicit factor, bypassing the registry.
    pub fn convert_unit_by(
        &self,
        from: &str,
        to: &str,
        factor: f64,
    ) -> Result<ScenarioTable, TableError> {
        ensure!(
            factor.is_finite() && factor != 0.0,
            InvalidConversionFactorSnafu { from, to, factor }
        );
        let mut out = self.clone();
        out.rescale_inplace(from, to, factor)?;
        Ok(out)
    }

    fn rescale_inplace(&mut self, from: &str, to: &str, factor: f64) -> Result<(), TableError> {
        if from != to {
            // A relabeled row must not land on an existing `to` row.
            for obs in self.iter().filter(|o| o.unit == from) {
                let mut key = obs.key();
                key.unit = to.to_string();
                ensure!(!self.contains_key(&key), KeyConflictSnafu { key });
            }
        }

        let mut rows = std::mem::take(&mut self.rows);
        let mut converted = 0usize;
        for obs in rows.iter_mut().filter(|o| o.unit == from) {
            obs.value *= factor;
            obs.unit = to.to_string();
            converted += 1;
        }
        self.replace_rows(rows);

        debug!("convert_unit '{from}' -> '{to}' (x{factor}): {converted} row(s)");
        Ok(())
    }
}
