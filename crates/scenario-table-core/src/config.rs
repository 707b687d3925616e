//! YAML configuration documents.
//!
//! Two documents are supported:
//! - a plotting *run control* ([`RunControl`]): per-label style maps and
//!   named category groupings, handed to renderers as an explicit value;
//! - a *unit table* ([`UnitTable`]): extra `(from, to, factor)` conversions
//!   merged into a [`crate::units::UnitRegistry`].

pub mod run_control;
pub mod unit_table;

use std::path::Path;

use serde::de::DeserializeOwned;
use snafu::prelude::*;

use crate::scenario_table::error::TableError;

pub use run_control::{RunControl, StyleKind, StyleMap};
pub use unit_table::{ConversionSpec, UnitTable};

/// Errors raised while loading or querying configuration documents.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    /// Reading the file failed.
    #[snafu(display("Failed to read config file {path}: {source}"))]
    Io {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The document is not valid YAML for the expected structure.
    #[snafu(display("Invalid YAML in {origin}: {source}"))]
    Yaml {
        /// File path or `<inline>`.
        origin: String,
        /// Underlying parse error.
        source: serde_yaml::Error,
    },

    /// A named category group does not exist.
    #[snafu(display("Unknown category group '{name}' (available: {available})"))]
    UnknownGroup {
        /// Requested group.
        name: String,
        /// Comma-separated list of defined groups.
        available: String,
    },

    /// A unit conversion entry was rejected by the registry.
    #[snafu(display("Invalid unit conversion in {origin}: {source}"))]
    Conversion {
        /// File path or `<inline>`.
        origin: String,
        /// Underlying registry error.
        source: TableError,
    },
}

pub(crate) const INLINE: &str = "<inline>";

pub(crate) fn parse_yaml<T: DeserializeOwned>(text: &str, origin: &str) -> Result<T, ConfigError> {
    serde_yaml::from_str(text).context(YamlSnafu { origin })
}

pub(crate) fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let origin = path.display().to_string();
    let text = std::fs::read_to_string(path).context(IoSnafu { path: origin.as_str() })?;
    parse_yaml(&text, &origin)
}
