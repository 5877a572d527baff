//! CSV dataset loading

use crate::ml::error::{MlError, MlResult};
use crate::ml::schema::{FeatureKind, FeatureSchema, FeatureValue};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// One row of the dataset
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRecord {
    /// Feature values in schema order
    pub values: Vec<FeatureValue>,

    /// Maintenance outcome label as it appears in the dataset
    pub label: String,
}

/// Rows loaded for a single schema
#[derive(Debug, Clone)]
pub struct TrainingTable {
    pub schema: FeatureSchema,
    pub records: Vec<TrainingRecord>,
}

impl TrainingTable {
    pub fn new(schema: FeatureSchema, records: Vec<TrainingRecord>) -> Self {
        Self { schema, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct labels in sorted order
    pub fn labels(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.label.as_str()).collect()
    }
}

/// Reads a CSV file with a header row into a [`TrainingTable`]
pub struct DatasetLoader {
    schema: FeatureSchema,
}

impl DatasetLoader {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    /// Load a dataset from disk
    pub fn load_path(&self, path: impl AsRef<Path>) -> MlResult<TrainingTable> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            MlError::DataFormat(format!("cannot open dataset '{}': {}", path.display(), e))
        })?;

        let table = self.load_reader(file)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            features = self.schema.len(),
            "Dataset loaded"
        );
        Ok(table)
    }

    /// Load a dataset from any reader producing CSV text
    pub fn load_reader<R: Read>(&self, reader: R) -> MlResult<TrainingTable> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| MlError::DataFormat(format!("cannot read header row: {}", e)))?
            .clone();

        let column_index = |name: &str| headers.iter().position(|h| h == name);

        let mut missing = Vec::new();
        let mut feature_columns = Vec::with_capacity(self.schema.len());
        for spec in &self.schema.features {
            match column_index(&spec.column) {
                Some(idx) => feature_columns.push(idx),
                None => missing.push(spec.column.clone()),
            }
        }
        let label_column = column_index(&self.schema.label_column);
        if label_column.is_none() {
            missing.push(self.schema.label_column.clone());
        }

        if !missing.is_empty() {
            return Err(MlError::DataFormat(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }
        let label_column = label_column.unwrap_or_default();

        let mut records = Vec::new();
        for (row_idx, row) in csv_reader.records().enumerate() {
            let row_number = row_idx + 1;
            let row = row.map_err(|e| {
                MlError::DataFormat(format!("row {}: malformed record: {}", row_number, e))
            })?;

            let mut values = Vec::with_capacity(feature_columns.len());
            for (spec, &col) in self.schema.features.iter().zip(feature_columns.iter()) {
                let cell = row.get(col).unwrap_or("");
                values.push(parse_cell(cell, spec.kind).map_err(|reason| {
                    MlError::DataFormat(format!(
                        "row {}: column '{}': {}",
                        row_number, spec.column, reason
                    ))
                })?);
            }

            let label = row.get(label_column).unwrap_or("");
            if label.is_empty() {
                return Err(MlError::DataFormat(format!(
                    "row {}: column '{}' is empty",
                    row_number, self.schema.label_column
                )));
            }

            records.push(TrainingRecord {
                values,
                label: label.to_string(),
            });
        }

        debug!(rows = records.len(), "Parsed dataset rows");

        Ok(TrainingTable::new(self.schema.clone(), records))
    }
}

fn parse_cell(cell: &str, kind: FeatureKind) -> Result<FeatureValue, String> {
    if cell.is_empty() {
        return Err("value is empty".to_string());
    }

    match kind {
        FeatureKind::Numeric => {
            let value: f64 = cell
                .parse()
                .map_err(|_| format!("'{}' is not a number", cell))?;
            if !value.is_finite() {
                return Err(format!("'{}' is not a finite number", cell));
            }
            Ok(FeatureValue::Number(value))
        }
        FeatureKind::Categorical => Ok(FeatureValue::Category(cell.to_string())),
    }
}
