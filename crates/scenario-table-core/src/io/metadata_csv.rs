//! Run metadata tables: `model, scenario, <attribute>, ...`.
//!
//! Every column other than `model` and `scenario` becomes a declared
//! attribute, so a predicate may name it even where every cell is empty.
//! Attribute names are lowercased like the rest of the IAMC header. Values
//! are stored as text; empty cells leave the attribute unset for that run.
//! A run listed twice keeps only its last row.

use std::path::Path;

use arrow::datatypes::DataType;
use log::{debug, warn};
use snafu::prelude::*;

use crate::{
    io::{CsvFile, LoadError, MissingValueSnafu, text_cell, utf8},
    metadata::RunMetadata,
    observation::RunKey,
};

/// Load per-run metadata from a CSV file.
pub fn read_metadata_csv(path: impl AsRef<Path>) -> Result<RunMetadata, LoadError> {
    let csv = CsvFile::open(path.as_ref())?;
    let model = csv.require("model")?;
    let scenario = csv.require("scenario")?;

    // Unnamed columns (a written index) are skipped.
    let attributes: Vec<(usize, String)> = csv
        .header
        .iter()
        .enumerate()
        .filter(|(i, name)| *i != model && *i != scenario && !name.is_empty())
        .map(|(i, name)| (i, name.to_lowercase()))
        .collect();

    let mut metadata = RunMetadata::with_attributes(attributes.iter().map(|(_, a)| a.clone()));
    let path = csv.path.clone();
    let width = csv.header.len();
    let batches = csv.read_batches(vec![DataType::Utf8; width])?;

    let mut offset = 0usize;
    for batch in &batches {
        let models = utf8(batch, model, &path)?;
        let scenarios = utf8(batch, scenario, &path)?;
        let values = attributes
            .iter()
            .map(|(i, name)| Ok((name.as_str(), utf8(batch, *i, &path)?)))
            .collect::<Result<Vec<_>, LoadError>>()?;

        for r in 0..batch.num_rows() {
            let row = offset + r + 1;
            let m = text_cell(models, r).context(MissingValueSnafu {
                path: path.as_str(),
                column: "model",
                row,
            })?;
            let s = text_cell(scenarios, r).context(MissingValueSnafu {
                path: path.as_str(),
                column: "scenario",
                row,
            })?;
            if metadata.remove_run(&RunKey::new(m, s)).is_some() {
                warn!("{path}: run {m}/{s} listed more than once, keeping the last row");
            }
            for (name, column) in &values {
                if let Some(value) = text_cell(column, r) {
                    metadata.insert(RunKey::new(m, s), *name, value);
                }
            }
        }
        offset += batch.num_rows();
    }

    debug!("{path}: loaded metadata for {} run(s)", metadata.len());
    Ok(metadata)
}
