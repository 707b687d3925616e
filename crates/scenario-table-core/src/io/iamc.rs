//! IAMC-format scenario data.
//!
//! Two layouts are accepted, detected from the header:
//!
//! - wide: `model, scenario, region, variable, unit, <year>, <year>, ...`
//! - long: `model, scenario, region, variable, unit, year, value`
//!
//! Header names are matched case-insensitively and extra non-year columns
//! are ignored. Empty value cells are skipped rather than stored.

use std::path::Path;

use arrow::{
    array::{Array, AsArray, Float64Array, Int64Array},
    datatypes::{DataType, Int64Type},
};
use log::debug;
use snafu::prelude::*;

use crate::{
    io::{
        ColumnTypeSnafu, CsvFile, InvalidYearSnafu, LoadError, MissingValueSnafu,
        NoYearColumnsSnafu, TableSnafu, float64, parse_year, text_cell, utf8,
    },
    metadata::RunMetadata,
    observation::Observation,
    scenario_table::ScenarioTable,
};

const ID_COLUMNS: [&str; 5] = ["model", "scenario", "region", "variable", "unit"];

enum Layout {
    Wide { years: Vec<(usize, i32)> },
    Long { year: usize, value: usize },
}

// Per-batch typed views of the value columns.
enum Columns<'a> {
    Wide(Vec<(i32, &'a Float64Array)>),
    Long {
        years: &'a Int64Array,
        values: &'a Float64Array,
    },
}

/// Load an IAMC CSV file into a table without run metadata.
pub fn read_iamc_csv(path: impl AsRef<Path>) -> Result<ScenarioTable, LoadError> {
    read_iamc_csv_with_metadata(path, RunMetadata::new())
}

/// Load an IAMC CSV file into a table carrying `metadata`.
pub fn read_iamc_csv_with_metadata(
    path: impl AsRef<Path>,
    metadata: RunMetadata,
) -> Result<ScenarioTable, LoadError> {
    let csv = CsvFile::open(path.as_ref())?;
    let ids = ID_COLUMNS
        .iter()
        .map(|name| csv.require(name))
        .collect::<Result<Vec<_>, _>>()?;

    let layout = match (csv.position("year"), csv.position("value")) {
        (Some(year), Some(value)) => Layout::Long { year, value },
        _ => {
            let years: Vec<(usize, i32)> = csv
                .header
                .iter()
                .enumerate()
                .filter(|(i, _)| !ids.contains(i))
                .filter_map(|(i, name)| parse_year(name).map(|y| (i, y)))
                .collect();
            ensure!(!years.is_empty(), NoYearColumnsSnafu { path: csv.path.as_str() });
            Layout::Wide { years }
        }
    };

    let types = (0..csv.header.len())
        .map(|i| match &layout {
            Layout::Wide { years } if years.iter().any(|(c, _)| *c == i) => DataType::Float64,
            Layout::Long { year, .. } if *year == i => DataType::Int64,
            Layout::Long { value, .. } if *value == i => DataType::Float64,
            _ => DataType::Utf8,
        })
        .collect();

    let path = csv.path.clone();
    let batches = csv.read_batches(types)?;

    let mut rows = Vec::new();
    let mut offset = 0usize;
    for batch in &batches {
        let id_columns = ids
            .iter()
            .map(|&i| utf8(batch, i, &path))
            .collect::<Result<Vec<_>, _>>()?;
        let columns = match &layout {
            Layout::Wide { years } => Columns::Wide(
                years
                    .iter()
                    .map(|&(c, year)| Ok((year, float64(batch, c, &path)?)))
                    .collect::<Result<Vec<_>, LoadError>>()?,
            ),
            Layout::Long { year, value } => Columns::Long {
                years: batch
                    .column(*year)
                    .as_primitive_opt::<Int64Type>()
                    .context(ColumnTypeSnafu { path: path.as_str(), idx: *year })?,
                values: float64(batch, *value, &path)?,
            },
        };

        for r in 0..batch.num_rows() {
            let row_no = offset + r + 1;
            let cell = |i: usize| {
                text_cell(id_columns[i], r).context(MissingValueSnafu {
                    path: path.as_str(),
                    column: ID_COLUMNS[i],
                    row: row_no,
                })
            };
            let (model, scenario, region, variable, unit) =
                (cell(0)?, cell(1)?, cell(2)?, cell(3)?, cell(4)?);
            let observation =
                |year, value| Observation::new(model, scenario, region, variable, unit, year, value);

            match &columns {
                Columns::Wide(years) => {
                    for (year, values) in years {
                        if !values.is_null(r) {
                            rows.push(observation(*year, values.value(r)));
                        }
                    }
                }
                Columns::Long { years, values } => {
                    if values.is_null(r) {
                        continue;
                    }
                    ensure!(
                        !years.is_null(r),
                        MissingValueSnafu { path: path.as_str(), column: "year", row: row_no }
                    );
                    let raw = years.value(r);
                    let year = i32::try_from(raw).ok().context(InvalidYearSnafu {
                        path: path.as_str(),
                        value: raw.to_string(),
                    })?;
                    rows.push(observation(year, values.value(r)));
                }
            }
        }
        offset += batch.num_rows();
    }

    debug!("{path}: loaded {} observation(s) from {offset} row(s)", rows.len());
    ScenarioTable::from_observations(rows, metadata).context(TableSnafu { path })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{observation::RunKey, scenario_table::error::TableError};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn write_csv(text: &str) -> Result<tempfile::NamedTempFile, std::io::Error> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn reads_wide_layout_and_skips_empty_cells() -> TestResult {
        let file = write_csv(
            "Model,Scenario,Region,Variable,Unit,2020,2030,2050\n\
             M1,S1,World,Emissions|CO2,Mt CO2/yr,40000,30000,\n\
             M1,S2,World,Emissions|CO2,Mt CO2/yr,38000,,5000\n",
        )?;
        let table = read_iamc_csv(file.path())?;

        assert_eq!(table.len(), 4);
        assert_eq!(table.years().into_iter().collect::<Vec<_>>(), vec![2020, 2030, 2050]);
        assert_eq!(
            table.runs().into_iter().collect::<Vec<_>>(),
            vec![RunKey::new("M1", "S1"), RunKey::new("M1", "S2")]
        );
        let last = table.rows().last().ok_or("empty")?;
        assert_eq!((last.year, last.value), (2050, 5000.0));
        Ok(())
    }

    #[test]
    fn reads_long_layout() -> TestResult {
        let file = write_csv(
            "model,scenario,region,variable,unit,year,value\n\
             M1,S1,World,Emissions|CO2,Mt CO2/yr,2020,40000\n\
             M1,S1,World,Emissions|CO2,Mt CO2/yr,2030,\n\
             M1,S1,World,Emissions|CO2,Mt CO2/yr,2050,10000\n",
        )?;
        let table = read_iamc_csv(file.path())?;
        assert_eq!(table.len(), 2);
        assert_eq!(table.years().into_iter().collect::<Vec<_>>(), vec![2020, 2050]);
        Ok(())
    }

    #[test]
    fn missing_id_column_is_reported() -> TestResult {
        let file = write_csv("model,scenario,variable,unit,2020\nM,S,V,U,1\n")?;
        let err = read_iamc_csv(file.path()).expect_err("no region column");
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "region"));
        Ok(())
    }

    #[test]
    fn wide_file_without_years_is_rejected() -> TestResult {
        let file = write_csv("model,scenario,region,variable,unit,note\nM,S,R,V,U,x\n")?;
        let err = read_iamc_csv(file.path()).expect_err("no year columns");
        assert!(matches!(err, LoadError::NoYearColumns { .. }));
        Ok(())
    }

    #[test]
    fn duplicate_rows_are_a_table_error() -> TestResult {
        let file = write_csv(
            "model,scenario,region,variable,unit,2020\n\
             M,S,World,V,U,1\n\
             M,S,World,V,U,2\n",
        )?;
        let err = read_iamc_csv(file.path()).expect_err("duplicate key");
        assert!(matches!(
            err,
            LoadError::Table { source: TableError::KeyConflict { .. }, .. }
        ));
        Ok(())
    }

    #[test]
    fn empty_id_cell_is_a_missing_value() -> TestResult {
        let file = write_csv("model,scenario,region,variable,unit,2020\nM,,World,V,U,1\n")?;
        let err = read_iamc_csv(file.path()).expect_err("empty scenario");
        assert!(matches!(err, LoadError::MissingValue { row: 1, .. }));
        Ok(())
    }
}
