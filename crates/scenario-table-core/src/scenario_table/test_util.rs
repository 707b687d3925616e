use crate::{
    metadata::RunMetadata,
    observation::{Observation, RunKey},
    scenario_table::{ScenarioTable, error::TableError},
};

pub(crate) type TestResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) const CO2: &str = "Emissions|CO2";
pub(crate) const MT: &str = "Mt CO2/yr";
pub(crate) const GT: &str = "Gt CO2/yr";

pub(crate) fn co2(model: &str, scenario: &str, year: i32, value: f64) -> Observation {
    Observation::new(model, scenario, "World", CO2, MT, year, value)
}

pub(crate) fn sample_metadata() -> RunMetadata {
    let mut meta = RunMetadata::new();
    meta.set_category(RunKey::new("M1", "S1"), "Above 2C");
    meta.set_category(RunKey::new("M1", "S2"), "1.5C low overshoot");
    meta.set_category(RunKey::new("M2", "S1"), "Lower 2C");
    meta
}

/// Four runs (M3/S1 without metadata) over 2020/2030/2050, plus one
/// energy row in M2/S1 with a different unit and variable.
pub(crate) fn sample_table() -> Result<ScenarioTable, TableError> {
    let mut rows = Vec::new();
    for (model, scenario, base) in [
        ("M1", "S1", 40_000.0),
        ("M1", "S2", 35_000.0),
        ("M2", "S1", 38_000.0),
        ("M3", "S1", 41_000.0),
    ] {
        for (i, year) in [2020, 2030, 2050].into_iter().enumerate() {
            rows.push(co2(model, scenario, year, base - 10_000.0 * i as f64));
        }
    }
    rows.push(Observation::new(
        "M2",
        "S1",
        "World",
        "Primary Energy",
        "EJ/yr",
        2020,
        580.0,
    ));
    ScenarioTable::from_observations(rows, sample_metadata())
}
