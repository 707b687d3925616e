//! Arrow export for `ScenarioTable`.
//!
//! The table is exported in long format with one Arrow row per observation:
//! `model, scenario, region, variable, unit, year, value`, optionally
//! followed by a nullable column holding each run's metadata label.

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, Float64Builder, Int32Builder, RecordBatch, StringBuilder},
    datatypes::{DataType, Field, Schema, SchemaRef},
};

use crate::scenario_table::{ScenarioTable, error::TableError};

const KEY_COLUMNS: [&str; 5] = ["model", "scenario", "region", "variable", "unit"];

/// Arrow schema of [`ScenarioTable::to_record_batch`].
pub fn long_schema(attribute: Option<&str>) -> SchemaRef {
    let mut fields: Vec<Field> = KEY_COLUMNS
        .iter()
        .map(|name| Field::new(*name, DataType::Utf8, false))
        .collect();
    fields.push(Field::new("year", DataType::Int32, false));
    fields.push(Field::new("value", DataType::Float64, false));
    if let Some(attribute) = attribute {
        fields.push(Field::new(attribute, DataType::Utf8, true));
    }
    Arc::new(Schema::new(fields))
}

impl ScenarioTable {
    /// Export all rows as a single long-format batch.
    ///
    /// With `attribute`, an extra nullable column carries each run's
    /// metadata value (null for runs without one).
    pub fn to_record_batch(&self, attribute: Option<&str>) -> Result<RecordBatch, TableError> {
        let n = self.len();
        let mut keys: Vec<StringBuilder> = KEY_COLUMNS
            .iter()
            .map(|_| StringBuilder::with_capacity(n, n * 16))
            .collect();
        let mut years = Int32Builder::with_capacity(n);
        let mut values = Float64Builder::with_capacity(n);
        let mut labels = StringBuilder::with_capacity(n, n * 8);

        for obs in self.iter() {
            for (builder, field) in keys.iter_mut().zip([
                &obs.model,
                &obs.scenario,
                &obs.region,
                &obs.variable,
                &obs.unit,
            ]) {
                builder.append_value(field);
            }
            years.append_value(obs.year);
            values.append_value(obs.value);
            if let Some(attribute) = attribute {
                labels.append_option(self.label_of(&obs.model, &obs.scenario, attribute));
            }
        }

        let mut columns: Vec<ArrayRef> = keys
            .iter_mut()
            .map(|b| Arc::new(b.finish()) as ArrayRef)
            .collect();
        columns.push(Arc::new(years.finish()));
        columns.push(Arc::new(values.finish()));
        if attribute.is_some() {
            columns.push(Arc::new(labels.finish()));
        }

        RecordBatch::try_new(long_schema(attribute), columns)
            .map_err(|source| TableError::Arrow { source })
    }
}
