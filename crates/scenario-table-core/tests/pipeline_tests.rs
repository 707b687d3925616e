#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use scenario_table_core::{
    AppendSpec, CATEGORY, Predicate, RunKey, ScenarioTable,
    config::{RunControl, StyleKind, UnitTable},
    io::{read_block_csv, read_iamc_csv_with_metadata, read_metadata_csv},
};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const CO2: &str = "Emissions|CO2";

fn write(dir: &Path, name: &str, text: &str) -> Result<PathBuf, std::io::Error> {
    let path = dir.join(name);
    fs::write(&path, text)?;
    Ok(path)
}

fn load_ensemble(dir: &Path) -> Result<ScenarioTable, Box<dyn std::error::Error>> {
    let data = write(
        dir,
        "ensemble.csv",
        "model,scenario,region,variable,unit,2020,2030,2050\n\
         M1,S1,World,Emissions|CO2,Mt CO2/yr,40000,42000,45000\n\
         M1,S2,World,Emissions|CO2,Mt CO2/yr,39000,20000,-2000\n\
         M2,S1,World,Emissions|CO2,Mt CO2/yr,40500,30000,8000\n\
         M2,S1,World,Primary Energy,EJ/yr,580,600,\n",
    )?;
    let meta = write(
        dir,
        "meta.csv",
        "model,scenario,category\n\
         M1,S1,Above 2C\n\
         M1,S2,1.5C low overshoot\n\
         M2,S1,Lower 2C\n",
    )?;
    let metadata = read_metadata_csv(meta)?;
    Ok(read_iamc_csv_with_metadata(data, metadata)?)
}

#[test]
fn compare_pipeline_excludes_converts_and_appends() -> TestResult {
    let tmp = TempDir::new()?;
    let table = load_ensemble(tmp.path())?;
    assert_eq!(table.len(), 11);

    let block = read_block_csv(write(
        tmp.path(),
        "iea.csv",
        "IEA,2020,2030,2050\nSDS,33.4,27.4,9.8\n",
    )?)?;

    let out = table
        .exclude(&Predicate::category("Above 2C"))?
        .filter(&Predicate::equals("variable", CO2).and(Predicate::years([2020, 2030, 2050])))?
        .convert_unit("Mt CO2/yr", "Gt CO2/yr")?
        .append_block(&block, &AppendSpec::new("IEA ETP 2020", "SDS", CO2, "Gt CO2/yr"))?;

    assert!(!out.runs().contains(&RunKey::new("M1", "S1")));
    assert_eq!(out.units().into_iter().collect::<Vec<_>>(), vec!["Gt CO2/yr"]);
    assert_eq!(out.len(), 2 * 3 + 3);

    let groups = out.group_by(CATEGORY);
    let iea = groups
        .get(&None)
        .and_then(|series| series.iter().find(|s| s.model == "IEA ETP 2020"))
        .ok_or("reference curve missing")?;
    assert_eq!(iea.region, "IEA");
    assert_eq!(iea.value_at(2030), Some(27.4));

    let lower = &groups[&Some("Lower 2C".to_string())];
    let value = lower[0].value_at(2050).ok_or("no 2050 point")?;
    assert!((value - 8.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn excluding_every_category_keeps_only_unlabeled_runs() -> TestResult {
    let tmp = TempDir::new()?;
    let table = load_ensemble(tmp.path())?;
    let labels: Vec<String> = table
        .metadata()
        .labels(CATEGORY)
        .into_iter()
        .map(str::to_string)
        .collect();

    let out = table.exclude(&Predicate::is_in(CATEGORY, labels))?;
    assert!(out.is_empty());
    Ok(())
}

#[test]
fn run_control_groups_drive_category_selection() -> TestResult {
    let tmp = TempDir::new()?;
    let table = load_ensemble(tmp.path())?;
    let rc = RunControl::from_path(write(
        tmp.path(),
        "rc.yaml",
        "color:\n  category:\n    Lower 2C: blue\n    1.5C low overshoot: green\n\
         cats_15:\n  - 1.5C low overshoot\n  - Lower 2C\n",
    )?)?;

    let selected = table.filter(&rc.group_predicate("cats_15", CATEGORY)?)?;
    assert_eq!(
        selected.runs().into_iter().collect::<Vec<_>>(),
        vec![RunKey::new("M1", "S2"), RunKey::new("M2", "S1")]
    );
    assert_eq!(rc.style(StyleKind::Color, CATEGORY, "Lower 2C"), Some("blue"));
    Ok(())
}

#[test]
fn unit_table_extends_builtin_conversions() -> TestResult {
    let tmp = TempDir::new()?;
    let units = UnitTable::from_path(write(
        tmp.path(),
        "units.yaml",
        "conversions:\n  - from: EJ/yr\n    to: TWh/yr\n    factor: 277777.778\n",
    )?)?;
    let table = load_ensemble(tmp.path())?.with_unit_registry(units.to_registry()?);

    let out = table
        .convert_unit("EJ/yr", "TWh/yr")?
        .convert_unit("Mt CO2/yr", "Gt CO2/yr")?;
    assert!(out.units().contains("TWh/yr"));
    assert!(out.units().contains("Gt CO2/yr"));
    Ok(())
}
