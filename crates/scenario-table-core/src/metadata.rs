//! Per-run metadata side table.
//!
//! Metadata is keyed by `(model, scenario)` and holds named string
//! attributes (most importantly [`CATEGORY`]). It is loaded once and joined
//! against observation rows only when a predicate asks for it; rows never
//! carry a copy of their run's attributes.
//!
//! The set of *declared* attributes is tracked separately from the values:
//! a metadata source with a `category` column declares `category` even if
//! some runs leave it empty. Predicates may only reference declared
//! attributes. [`CATEGORY`] is always known, so category filters on a table
//! without metadata match nothing instead of failing.

use std::collections::{BTreeMap, BTreeSet};

use crate::observation::RunKey;

/// Name of the temperature-category attribute used by the 1.5°C ensemble.
pub const CATEGORY: &str = "category";

type Attributes = BTreeMap<String, String>;

/// Run metadata: `(model, scenario) -> {attribute -> value}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMetadata {
    attributes: BTreeSet<String>,
    // model -> scenario -> attributes, so lookups can borrow row fields.
    runs: BTreeMap<String, BTreeMap<String, Attributes>>,
}

impl RunMetadata {
    /// Empty metadata with no declared attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty metadata declaring the given attribute names.
    pub fn with_attributes<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RunMetadata {
            attributes: attributes.into_iter().map(Into::into).collect(),
            runs: BTreeMap::new(),
        }
    }

    /// Declare an attribute name without assigning any values.
    pub fn declare(&mut self, attribute: impl Into<String>) {
        self.attributes.insert(attribute.into());
    }

    /// Set `attribute` for `run`, declaring the attribute if needed.
    ///
    /// Returns the previous value, if any.
    pub fn insert(
        &mut self,
        run: RunKey,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        let attribute = attribute.into();
        self.attributes.insert(attribute.clone());
        self.runs
            .entry(run.model)
            .or_default()
            .entry(run.scenario)
            .or_default()
            .insert(attribute, value.into())
    }

    /// Shorthand for `insert(run, CATEGORY, category)`.
    pub fn set_category(&mut self, run: RunKey, category: impl Into<String>) -> Option<String> {
        self.insert(run, CATEGORY, category)
    }

    /// Look up `attribute` for the run `(model, scenario)`.
    pub fn get(&self, model: &str, scenario: &str, attribute: &str) -> Option<&str> {
        self.runs
            .get(model)
            .and_then(|scenarios| scenarios.get(scenario))
            .and_then(|attrs| attrs.get(attribute))
            .map(String::as_str)
    }

    /// Look up the [`CATEGORY`] attribute for `(model, scenario)`.
    pub fn category(&self, model: &str, scenario: &str) -> Option<&str> {
        self.get(model, scenario, CATEGORY)
    }

    /// True when `(model, scenario)` has at least one metadata entry.
    pub fn contains_run(&self, model: &str, scenario: &str) -> bool {
        self.runs
            .get(model)
            .is_some_and(|scenarios| scenarios.contains_key(scenario))
    }

    /// True when `attribute` is declared. [`CATEGORY`] always is.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        attribute == CATEGORY || self.attributes.contains(attribute)
    }

    /// Drop every attribute of `run`, returning the removed values.
    pub fn remove_run(&mut self, run: &RunKey) -> Option<BTreeMap<String, String>> {
        let scenarios = self.runs.get_mut(&run.model)?;
        let removed = scenarios.remove(&run.scenario);
        if scenarios.is_empty() {
            self.runs.remove(&run.model);
        }
        removed
    }

    /// Declared attribute names in sorted order.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(String::as_str)
    }

    /// All runs that have metadata, in sorted order.
    pub fn runs(&self) -> impl Iterator<Item = RunKey> + '_ {
        self.runs.iter().flat_map(|(model, scenarios)| {
            scenarios
                .keys()
                .map(move |scenario| RunKey::new(model.as_str(), scenario.as_str()))
        })
    }

    /// Distinct values taken by `attribute` across all runs.
    pub fn labels(&self, attribute: &str) -> BTreeSet<&str> {
        self.runs
            .values()
            .flat_map(BTreeMap::values)
            .filter_map(|attrs| attrs.get(attribute))
            .map(String::as_str)
            .collect()
    }

    /// Number of runs with metadata.
    pub fn len(&self) -> usize {
        self.runs.values().map(BTreeMap::len).sum()
    }

    /// True when no run has metadata.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge `other` into `self`. Existing values win on conflict.
    pub fn merge(&mut self, other: &RunMetadata) {
        self.attributes.extend(other.attributes.iter().cloned());
        for (model, scenarios) in &other.runs {
            let ours = self.runs.entry(model.clone()).or_default();
            for (scenario, attrs) in scenarios {
                let slot = ours.entry(scenario.clone()).or_default();
                for (name, value) in attrs {
                    slot.entry(name.clone()).or_insert_with(|| value.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_declares_attribute_and_returns_previous() {
        let mut meta = RunMetadata::new();
        assert!(meta.has_attribute(CATEGORY));
        assert!(!meta.has_attribute("baseline"));
        assert_eq!(meta.attributes().count(), 0);

        assert_eq!(meta.set_category(RunKey::new("M1", "S1"), "Lower 2C"), None);
        assert_eq!(meta.attributes().collect::<Vec<_>>(), vec![CATEGORY]);
        assert_eq!(
            meta.set_category(RunKey::new("M1", "S1"), "Above 2C"),
            Some("Lower 2C".to_string())
        );
        assert_eq!(meta.category("M1", "S1"), Some("Above 2C"));
        assert_eq!(meta.category("M1", "S2"), None);
    }

    #[test]
    fn declared_attribute_without_values_is_known() {
        let meta = RunMetadata::with_attributes(["category", "baseline"]);
        assert!(meta.has_attribute("baseline"));
        assert!(meta.is_empty());
        assert_eq!(meta.attributes().collect::<Vec<_>>(), vec!["baseline", "category"]);
    }

    #[test]
    fn labels_and_runs_are_sorted() {
        let mut meta = RunMetadata::new();
        meta.set_category(RunKey::new("M2", "S1"), "Lower 2C");
        meta.set_category(RunKey::new("M1", "S2"), "1.5C low overshoot");
        meta.set_category(RunKey::new("M1", "S1"), "Lower 2C");

        assert_eq!(meta.len(), 3);
        assert_eq!(
            meta.labels(CATEGORY).into_iter().collect::<Vec<_>>(),
            vec!["1.5C low overshoot", "Lower 2C"]
        );
        assert_eq!(
            meta.runs().map(|r| r.to_string()).collect::<Vec<_>>(),
            vec!["M1/S1", "M1/S2", "M2/S1"]
        );
    }

    #[test]
    fn merge_keeps_existing_values() {
        let mut a = RunMetadata::new();
        a.set_category(RunKey::new("M1", "S1"), "Lower 2C");

        let mut b = RunMetadata::new();
        b.set_category(RunKey::new("M1", "S1"), "Above 2C");
        b.insert(RunKey::new("M2", "S1"), "baseline", "yes");

        a.merge(&b);
        assert_eq!(a.category("M1", "S1"), Some("Lower 2C"));
        assert_eq!(a.get("M2", "S1", "baseline"), Some("yes"));
        assert!(a.has_attribute("baseline"));
    }

    #[test]
    fn remove_run_drops_all_attributes() {
        let mut meta = RunMetadata::new();
        meta.set_category(RunKey::new("M1", "S1"), "Lower 2C");
        meta.insert(RunKey::new("M1", "S1"), "baseline", "no");
        meta.set_category(RunKey::new("M1", "S2"), "Above 2C");

        let removed = meta.remove_run(&RunKey::new("M1", "S1"));
        assert_eq!(removed.map(|attrs| attrs.len()), Some(2));
        assert!(!meta.contains_run("M1", "S1"));
        assert!(meta.contains_run("M1", "S2"));
        assert!(meta.has_attribute("baseline"));
        assert_eq!(meta.remove_run(&RunKey::new("M9", "S1")), None);
    }
}
