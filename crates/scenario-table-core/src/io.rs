//! CSV loaders for scenario data, run metadata, and reference blocks.
//!
//! All loaders read through `arrow-csv` with an explicit schema derived from
//! the header line: identifier columns as `Utf8`, year/value columns as
//! numeric. Empty numeric cells are treated as missing and skipped, so the
//! resulting tables only hold real values.
//!
//! - [`read_iamc_csv`]: IAMC wide (`model,scenario,region,variable,unit,2020,...`)
//!   or long (`...,year,value`) scenario data.
//! - [`read_metadata_csv`]: `model,scenario,<attribute>...` run metadata.
//! - [`read_block_csv`]: `<index name>,<year>...` reference blocks.

pub mod block;
pub mod iamc;
pub mod metadata_csv;

use std::{fs::File, io::Seek, path::Path, sync::Arc};

use arrow::{
    array::{Array, AsArray, Float64Array, RecordBatch, StringArray},
    datatypes::{DataType, Field, Float64Type, Schema},
    error::ArrowError,
};
use arrow_csv::{ReaderBuilder, reader::Format};
use snafu::prelude::*;

use crate::scenario_table::error::TableError;

pub use block::read_block_csv;
pub use iamc::{read_iamc_csv, read_iamc_csv_with_metadata};
pub use metadata_csv::read_metadata_csv;

/// Errors raised while loading CSV inputs.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LoadError {
    /// Opening or seeking the file failed.
    #[snafu(display("Failed to read {path}: {source}"))]
    Io {
        /// File path.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// CSV decoding failed (bad number, ragged line, ...).
    #[snafu(display("Failed to parse CSV {path}: {source}"))]
    Csv {
        /// File path.
        path: String,
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// A required column is absent from the header.
    #[snafu(display("{path}: missing required column '{column}'"))]
    MissingColumn {
        /// File path.
        path: String,
        /// Column name.
        column: String,
    },

    /// A required cell is empty.
    #[snafu(display("{path}: data row {row} has no value for '{column}'"))]
    MissingValue {
        /// File path.
        path: String,
        /// Column name.
        column: String,
        /// 1-based data row number (header excluded).
        row: usize,
    },

    /// A year label or year cell is not an integer year.
    #[snafu(display("{path}: '{value}' is not a valid year"))]
    InvalidYear {
        /// File path.
        path: String,
        /// Offending text.
        value: String,
    },

    /// A wide-format file has no year columns.
    #[snafu(display("{path}: no year columns found in header"))]
    NoYearColumns {
        /// File path.
        path: String,
    },

    /// A decoded column does not have the type it was declared with.
    #[snafu(display("{path}: column {idx} decoded with an unexpected type"))]
    ColumnType {
        /// File path.
        path: String,
        /// 0-based column index.
        idx: usize,
    },

    /// The rows could not form a table (e.g. duplicate keys).
    #[snafu(display("{path}: {source}"))]
    Table {
        /// File path.
        path: String,
        /// Underlying table error.
        source: TableError,
    },
}

/// An open CSV file with its header names.
pub(crate) struct CsvFile {
    pub(crate) path: String,
    pub(crate) header: Vec<String>,
    file: File,
}

impl CsvFile {
    pub(crate) fn open(path: &Path) -> Result<Self, LoadError> {
        let display = path.display().to_string();
        let mut file = File::open(path).context(IoSnafu { path: display.as_str() })?;

        let (schema, _) = Format::default()
            .with_header(true)
            .infer_schema(&mut file, Some(1))
            .context(CsvSnafu { path: display.as_str() })?;
        file.rewind().context(IoSnafu { path: display.as_str() })?;

        let header = schema
            .fields()
            .iter()
            .map(|f| f.name().trim().to_string())
            .collect();

        Ok(CsvFile {
            path: display,
            header,
            file,
        })
    }

    /// Position of `name` in the header, case-insensitively.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    pub(crate) fn require(&self, name: &str) -> Result<usize, LoadError> {
        self.position(name).context(MissingColumnSnafu {
            path: self.path.as_str(),
            column: name,
        })
    }

    /// Decode the whole file with one data type per header column.
    pub(crate) fn read_batches(self, types: Vec<DataType>) -> Result<Vec<RecordBatch>, LoadError> {
        let fields: Vec<Field> = self
            .header
            .iter()
            .zip(types)
            .enumerate()
            .map(|(i, (name, dt))| Field::new(format!("{i}:{name}"), dt, true))
            .collect();

        let reader = ReaderBuilder::new(Arc::new(Schema::new(fields)))
            .with_header(true)
            .build(self.file)
            .context(CsvSnafu { path: self.path.as_str() })?;

        reader
            .collect::<Result<Vec<_>, _>>()
            .context(CsvSnafu { path: self.path.as_str() })
    }
}

/// Non-empty, trimmed text of a `Utf8` cell.
pub(crate) fn text_cell(column: &StringArray, row: usize) -> Option<&str> {
    if column.is_null(row) {
        return None;
    }
    let s = column.value(row).trim();
    (!s.is_empty()).then_some(s)
}

/// Downcast a column declared as `Utf8` in [`CsvFile::read_batches`].
pub(crate) fn utf8<'a>(
    batch: &'a RecordBatch,
    idx: usize,
    path: &str,
) -> Result<&'a StringArray, LoadError> {
    batch
        .column(idx)
        .as_string_opt::<i32>()
        .context(ColumnTypeSnafu { path, idx })
}

/// Downcast a column declared as `Float64` in [`CsvFile::read_batches`].
pub(crate) fn float64<'a>(
    batch: &'a RecordBatch,
    idx: usize,
    path: &str,
) -> Result<&'a Float64Array, LoadError> {
    batch
        .column(idx)
        .as_primitive_opt::<Float64Type>()
        .context(ColumnTypeSnafu { path, idx })
}

pub(crate) fn parse_year(text: &str) -> Option<i32> {
    text.trim().parse::<i32>().ok()
}
