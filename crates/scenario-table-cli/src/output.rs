use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use arrow::{
    array::RecordBatch,
    error::ArrowError,
    util::display::{ArrayFormatter, FormatOptions},
};
use parquet::arrow::ArrowWriter;
use snafu::ResultExt;
use tabled::{builder::Builder, settings::Style};

use crate::error::{ArrowSnafu, CliResult, ParquetSnafu, StdoutSnafu, WriteOutputSnafu};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Jsonl,
    Parquet,
}

#[derive(Debug, Clone)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl Preview {
    /// Format the first `max_rows` rows of `batch` as strings.
    pub fn of_batch(batch: &RecordBatch, max_rows: usize) -> CliResult<Self> {
        let columns = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect();

        let options = FormatOptions::default().with_null("-");
        let formatters = batch
            .columns()
            .iter()
            .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
            .collect::<Result<Vec<_>, ArrowError>>()
            .context(ArrowSnafu)?;

        let take = max_rows.min(batch.num_rows());
        let mut rows = Vec::with_capacity(take);
        for row_idx in 0..take {
            let mut row = Vec::with_capacity(formatters.len());
            for formatter in &formatters {
                row.push(formatter.value(row_idx).try_to_string().context(ArrowSnafu)?);
            }
            rows.push(row);
        }

        Ok(Preview {
            columns,
            rows,
            total_rows: batch.num_rows(),
        })
    }
}

pub fn render_table(columns: &[String], rows: &[Vec<String>]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    builder.push_record(columns);
    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

pub fn write_preview<W: Write>(preview: &Preview, out: &mut W) -> CliResult<()> {
    if !preview.rows.is_empty() {
        writeln!(out, "{}", render_table(&preview.columns, &preview.rows)).context(StdoutSnafu)?;
    }
    if preview.total_rows == 0 {
        writeln!(out, "(no rows)").context(StdoutSnafu)?;
    } else if preview.rows.is_empty() {
        writeln!(out, "(preview suppressed; use --max-rows > 0)").context(StdoutSnafu)?;
    }
    writeln!(out, "total_rows: {}", preview.total_rows).context(StdoutSnafu)?;
    Ok(())
}

/// Write `batch` to `path` in `format`, replacing any existing file.
pub fn write_batch(path: &Path, format: OutputFormat, batch: &RecordBatch) -> CliResult<()> {
    let display = path.display().to_string();
    let file = File::create(path).context(WriteOutputSnafu { path: display.as_str() })?;
    let sink = BufWriter::new(file);

    let mut sink = match format {
        OutputFormat::Csv => {
            let mut writer = arrow_csv::WriterBuilder::new().build(sink);
            writer.write(batch).context(ArrowSnafu)?;
            writer.into_inner()
        }
        OutputFormat::Jsonl => {
            let mut writer = arrow_json::LineDelimitedWriter::new(sink);
            writer.write_batches(&[batch]).context(ArrowSnafu)?;
            writer.finish().context(ArrowSnafu)?;
            writer.into_inner()
        }
        OutputFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(sink, batch.schema(), None).context(ParquetSnafu)?;
            writer.write(batch).context(ParquetSnafu)?;
            writer.into_inner().context(ParquetSnafu)?
        }
    };
    sink.flush().context(WriteOutputSnafu { path: display })
}
