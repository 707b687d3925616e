use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use scenario_table_core::{TableError, config::ConfigError, io::LoadError};

use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Failed to load {what}: {source}"))]
    Load {
        what: &'static str,
        #[snafu(source(from(LoadError, Box::new)))]
        source: Box<LoadError>,
    },

    #[snafu(display("Invalid configuration: {source}"))]
    Config {
        #[snafu(source(from(ConfigError, Box::new)))]
        source: Box<ConfigError>,
    },

    #[snafu(display("Invalid --{flag} '{spec}': {source}"))]
    InvalidPredicate {
        flag: &'static str,
        spec: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display(
        "Invalid --reference '{spec}'. \
         Expected <path>:<model>:<scenario>."
    ))]
    InvalidReference { spec: String },

    #[snafu(display("--group requires --run-control"))]
    GroupWithoutRunControl,

    #[snafu(display("{step} failed: {source}"))]
    Pipeline {
        step: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Arrow error: {source}"))]
    Arrow { source: ArrowError },

    #[snafu(display("Parquet error: {source}"))]
    Parquet { source: ParquetError },

    #[snafu(display("Failed to write output: {path}"))]
    WriteOutput {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Failed to write to stdout: {source}"))]
    Stdout { source: std::io::Error },
}
