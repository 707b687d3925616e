//! Grouping rows into labeled series for rendering.
//!
//! A renderer needs, per line it draws, the identity of the run and the
//! metadata label used to pick a style. [`ScenarioTable::series`] collects
//! rows into one [`Series`] per `(model, scenario, region, variable, unit)`
//! and attaches the run's value for a chosen metadata attribute.
//! [`ScenarioTable::range_by_year`] summarizes each label into a per-year
//! envelope for shaded ranges.

use std::collections::BTreeMap;

use crate::{
    metadata::CATEGORY,
    observation::RunKey,
    scenario_table::ScenarioTable,
};

/// One time series with its run identity and metadata label.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Model name.
    pub model: String,
    /// Scenario name.
    pub scenario: String,
    /// Region label.
    pub region: String,
    /// Variable name.
    pub variable: String,
    /// Unit.
    pub unit: String,
    /// The run's metadata label, `None` for runs without one
    /// (typically appended reference curves).
    pub label: Option<String>,
    /// `(year, value)` points sorted by year.
    pub points: Vec<(i32, f64)>,
}

impl Series {
    /// The `(model, scenario)` run.
    pub fn run(&self) -> RunKey {
        RunKey::new(&self.model, &self.scenario)
    }

    /// Value at `year`, if present.
    pub fn value_at(&self, year: i32) -> Option<f64> {
        self.points
            .binary_search_by_key(&year, |(y, _)| *y)
            .ok()
            .map(|i| self.points[i].1)
    }
}

/// Summary of all values observed for one label in one year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearRange {
    /// Calendar year.
    pub year: i32,
    /// Smallest value.
    pub min: f64,
    /// Median value (mean of the middle pair for even counts).
    pub median: f64,
    /// Largest value.
    pub max: f64,
    /// Number of values.
    pub count: usize,
}

type SeriesKey<'a> = (&'a str, &'a str, &'a str, &'a str, &'a str);

impl ScenarioTable {
    /// The run's value for `attribute`.
    pub fn label_of(&self, model: &str, scenario: &str, attribute: &str) -> Option<&str> {
        self.metadata().get(model, scenario, attribute)
    }

    /// The run's category.
    pub fn category_of(&self, model: &str, scenario: &str) -> Option<&str> {
        self.label_of(model, scenario, CATEGORY)
    }

    /// One series per `(model, scenario, region, variable, unit)`, sorted by
    /// that tuple, labeled with each run's `attribute`.
    pub fn series(&self, attribute: &str) -> Vec<Series> {
        let mut grouped: BTreeMap<SeriesKey<'_>, Vec<(i32, f64)>> = BTreeMap::new();
        for obs in self.iter() {
            grouped
                .entry((
                    obs.model.as_str(),
                    obs.scenario.as_str(),
                    obs.region.as_str(),
                    obs.variable.as_str(),
                    obs.unit.as_str(),
                ))
                .or_default()
                .push((obs.year, obs.value));
        }

        grouped
            .into_iter()
            .map(|((model, scenario, region, variable, unit), mut points)| {
                points.sort_by_key(|(year, _)| *year);
                Series {
                    model: model.to_string(),
                    scenario: scenario.to_string(),
                    region: region.to_string(),
                    variable: variable.to_string(),
                    unit: unit.to_string(),
                    label: self.label_of(model, scenario, attribute).map(str::to_string),
                    points,
                }
            })
            .collect()
    }

    /// [`ScenarioTable::series`] grouped by label. Unlabeled series are
    /// grouped under `None`, which sorts first.
    pub fn group_by(&self, attribute: &str) -> BTreeMap<Option<String>, Vec<Series>> {
        let mut groups: BTreeMap<Option<String>, Vec<Series>> = BTreeMap::new();
        for series in self.series(attribute) {
            groups.entry(series.label.clone()).or_default().push(series);
        }
        groups
    }

    /// Per-label, per-year `min / median / max` over all rows.
    ///
    /// Values of different variables or units are pooled, so filter to a
    /// single variable and unit first.
    pub fn range_by_year(&self, attribute: &str) -> BTreeMap<Option<String>, Vec<YearRange>> {
        let mut pooled: BTreeMap<Option<&str>, BTreeMap<i32, Vec<f64>>> = BTreeMap::new();
        for obs in self.iter() {
            pooled
                .entry(self.label_of(&obs.model, &obs.scenario, attribute))
                .or_default()
                .entry(obs.year)
                .or_default()
                .push(obs.value);
        }

        pooled
            .into_iter()
            .map(|(label, years)| {
                let ranges = years
                    .into_iter()
                    .map(|(year, values)| summarize(year, values))
                    .collect();
                (label.map(str::to_string), ranges)
            })
            .collect()
    }
}

fn summarize(year: i32, mut values: Vec<f64>) -> YearRange {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    let median = if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    };
    YearRange {
        year,
        min: values[0],
        median,
        max: values[n - 1],
        count: n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        predicate::Predicate,
        scenario_table::{AppendSpec, ExternalBlock, test_util::*},
    };

    #[test]
    fn series_carry_run_identity_and_label() -> TestResult {
        let table = sample_table()?.filter(&Predicate::equals("variable", CO2))?;
        let series = table.series(CATEGORY);

        assert_eq!(series.len(), 4);
        let first = &series[0];
        assert_eq!(first.run(), RunKey::new("M1", "S1"));
        assert_eq!(first.label.as_deref(), Some("Above 2C"));
        assert_eq!(first.points.iter().map(|p| p.0).collect::<Vec<_>>(), vec![2020, 2030, 2050]);
        assert_eq!(first.value_at(2030), Some(30_000.0));
        assert_eq!(first.value_at(2040), None);

        let orphan = series.iter().find(|s| s.model == "M3").ok_or("missing M3")?;
        assert_eq!(orphan.label, None);
        Ok(())
    }

    #[test]
    fn group_by_puts_reference_curves_under_none() -> TestResult {
        let table = sample_table()?
            .filter(&Predicate::equals("variable", CO2))?
            .convert_unit(MT, GT)?
            .append_block(
                &ExternalBlock::series("IEA", "SDS", [(2020, 33.4), (2030, 27.4)]),
                &AppendSpec::new("IEA ETP 2020", "SDS", CO2, GT),
            )?;

        let groups = table.group_by(CATEGORY);
        let labels: Vec<Option<&str>> = groups.keys().map(Option::as_deref).collect();
        assert_eq!(
            labels,
            vec![None, Some("1.5C low overshoot"), Some("Above 2C"), Some("Lower 2C")]
        );
        // M3/S1 (no metadata) and the IEA curve.
        assert_eq!(groups[&None].len(), 2);
        Ok(())
    }

    #[test]
    fn range_by_year_computes_envelope() -> TestResult {
        let mut meta = crate::metadata::RunMetadata::new();
        for scenario in ["S1", "S2", "S3", "S4"] {
            meta.set_category(RunKey::new("M", scenario), "Lower 2C");
        }
        let rows = [("S1", 1.0), ("S2", 4.0), ("S3", 2.0), ("S4", 10.0)]
            .into_iter()
            .map(|(s, v)| co2("M", s, 2030, v));
        let table = ScenarioTable::from_observations(rows, meta)?;

        let ranges = table.range_by_year(CATEGORY);
        let lower = &ranges[&Some("Lower 2C".to_string())];
        assert_eq!(
            lower.as_slice(),
            &[YearRange {
                year: 2030,
                min: 1.0,
                median: 3.0,
                max: 10.0,
                count: 4,
            }]
        );
        Ok(())
    }
}
