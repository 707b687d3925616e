//! Predicate filtering for `ScenarioTable`.
//!
//! Filtering never mutates the receiver: it resolves the predicate against
//! the table's metadata once, keeps the matching rows, and returns a new
//! table sharing the same metadata and unit registry. An empty result is a
//! valid table, not an error.

use log::{debug, warn};

use crate::{
    predicate::Predicate,
    scenario_table::{ScenarioTable, error::TableError},
};

impl ScenarioTable {
    /// Rows matching `predicate`.
    ///
    /// Fails only when the predicate cannot be resolved (unknown field or a
    /// value of the wrong kind).
    pub fn filter(&self, predicate: &Predicate) -> Result<ScenarioTable, TableError> {
        let resolved = predicate.resolve(self.metadata())?;

        if resolved.references_metadata() {
            let orphans = self.runs_without_metadata();
            if !orphans.is_empty() {
                warn!(
                    "{} run(s) have no metadata and never match metadata predicates in '{predicate}'",
                    orphans.len()
                );
            }
        }

        let rows: Vec<_> = self
            .iter()
            .filter(|obs| resolved.matches(obs, self.metadata()))
            .cloned()
            .collect();

        debug!("filter '{predicate}': kept {} of {} rows", rows.len(), self.len());
        Ok(self.derive(rows))
    }

    /// Rows *not* matching `predicate`; `filter(&predicate.negate())`.
    pub fn exclude(&self, predicate: &Predicate) -> Result<ScenarioTable, TableError> {
        self.filter(&predicate.clone().negate())
    }

    /// `filter` when `keep` is true, `exclude` otherwise.
    pub fn filter_keep(&self, predicate: &Predicate, keep: bool) -> Result<ScenarioTable, TableError> {
        if keep {
            self.filter(predicate)
        } else {
            self.exclude(predicate)
        }
    }

    /// Split into `(matching, not matching)`.
    pub fn partition(
        &self,
        predicate: &Predicate,
    ) -> Result<(ScenarioTable, ScenarioTable), TableError> {
        let resolved = predicate.resolve(self.metadata())?;
        let (kept, dropped): (Vec<_>, Vec<_>) = self
            .iter()
            .cloned()
            .partition(|obs| resolved.matches(obs, self.metadata()));
        Ok((self.derive(kept), self.derive(dropped)))
    }
}
