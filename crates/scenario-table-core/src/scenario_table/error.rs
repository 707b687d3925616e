//! Error types and SNAFU context selectors for `scenario_table`.
//!
//! `TableError` covers every failure of the in-memory table operations
//! (filtering, unit conversion, appending) and predicate parsing. Loader and
//! configuration errors live in their own modules and wrap this type.

use arrow::error::ArrowError;
use snafu::prelude::*;

use crate::observation::ObservationKey;

/// Errors from scenario table operations.
///
/// An empty filter result is never an error; callers can distinguish "no
/// rows matched" (`Ok` with an empty table) from a failed filter (`Err`).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TableError {
    /// A predicate references a field that is neither a row field nor a
    /// declared metadata attribute.
    #[snafu(display(
        "Unknown filter field '{field}' (expected model, scenario, region, variable, unit, year, or a metadata attribute)"
    ))]
    UnknownField {
        /// Field name supplied by the caller.
        field: String,
    },

    /// A predicate value cannot be used with its field (e.g. a non-integer year).
    #[snafu(display("Invalid value '{value}' for filter field '{field}': {reason}"))]
    InvalidPredicateValue {
        /// Field the value was supplied for.
        field: String,
        /// Offending value, rendered as text.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A textual predicate could not be parsed.
    #[snafu(display("Malformed filter '{input}': {reason}"))]
    MalformedPredicate {
        /// Raw predicate text.
        input: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A conversion factor was zero, NaN, or infinite.
    #[snafu(display("Invalid conversion factor {factor} for '{from}' -> '{to}'"))]
    InvalidConversionFactor {
        /// Source unit.
        from: String,
        /// Target unit.
        to: String,
        /// Rejected factor.
        factor: f64,
    },

    /// No conversion factor is registered for the requested unit pair.
    #[snafu(display("No conversion registered from '{from}' to '{to}'"))]
    UnknownUnit {
        /// Source unit.
        from: String,
        /// Target unit.
        to: String,
    },

    /// An external block handed to `append_block` has the wrong shape.
    #[snafu(display("Cannot append external block: {reason}"))]
    Shape {
        /// Description of the shape problem.
        reason: String,
    },

    /// An operation would produce two rows with the same natural key.
    #[snafu(display("Duplicate observation key {key}"))]
    KeyConflict {
        /// The colliding key.
        key: ObservationKey,
    },

    /// Building an Arrow batch from the table failed.
    #[snafu(display("Arrow error while exporting table: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

impl TableError {
    /// True for the configuration class of errors: unknown fields,
    /// malformed predicates, bad predicate values, and bad factors.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TableError::UnknownField { .. }
                | TableError::InvalidPredicateValue { .. }
                | TableError::MalformedPredicate { .. }
                | TableError::InvalidConversionFactor { .. }
        )
    }
}
