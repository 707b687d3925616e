//! Digitized reference blocks: `<index name>, <year>, <year>, ...`.
//!
//! The first header cell names the row-label axis, the remaining header
//! cells are years. Each data row is one labeled series. Unlike scenario
//! data, every value cell must be filled: a gap in a reference curve is
//! an input error.

use std::path::Path;

use arrow::{array::Array, datatypes::DataType};
use log::debug;
use snafu::prelude::*;

use crate::{
    io::{
        CsvFile, InvalidYearSnafu, LoadError, MissingColumnSnafu, MissingValueSnafu, float64,
        parse_year, text_cell, utf8,
    },
    scenario_table::ExternalBlock,
};

/// Load an [`ExternalBlock`] from a CSV file.
pub fn read_block_csv(path: impl AsRef<Path>) -> Result<ExternalBlock, LoadError> {
    let csv = CsvFile::open(path.as_ref())?;
    let (index_name, year_labels) = csv.header.split_first().context(MissingColumnSnafu {
        path: csv.path.as_str(),
        column: "index",
    })?;
    let index_name = index_name.clone();

    let years = year_labels
        .iter()
        .map(|label| {
            parse_year(label).context(InvalidYearSnafu {
                path: csv.path.as_str(),
                value: label.as_str(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut types = vec![DataType::Utf8];
    types.extend(years.iter().map(|_| DataType::Float64));

    let path = csv.path.clone();
    let batches = csv.read_batches(types)?;

    let mut row_labels = Vec::new();
    let mut values = Vec::new();
    for batch in &batches {
        let labels = utf8(batch, 0, &path)?;
        let columns = (1..=years.len())
            .map(|c| float64(batch, c, &path))
            .collect::<Result<Vec<_>, _>>()?;

        for r in 0..batch.num_rows() {
            let row_no = row_labels.len() + 1;
            let mut row = Vec::with_capacity(years.len());
            for (column, year) in columns.iter().zip(&years) {
                ensure!(
                    !column.is_null(r),
                    MissingValueSnafu {
                        path: path.as_str(),
                        column: year.to_string(),
                        row: row_no,
                    }
                );
                row.push(column.value(r));
            }
            row_labels.push(text_cell(labels, r).unwrap_or_default().to_string());
            values.push(row);
        }
    }

    debug!(
        "{path}: loaded block '{index_name}' with {} row(s) x {} year(s)",
        values.len(),
        years.len()
    );
    Ok(ExternalBlock {
        index_name,
        row_labels,
        years,
        values,
    })
}
