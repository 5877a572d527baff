use crate::ml::dataset::TrainingTable;
use crate::ml::error::{FieldViolation, MlError, MlResult};
use crate::ml::schema::{FeatureKind, FeatureSchema, FeatureValue};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Observed value range of a numeric feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

/// Turns typed feature values into the numeric vectors the classifiers consume.
///
/// Fitted once on the training table and persisted with the model so that
/// requests are encoded exactly like the rows the model was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEncoder {
    /// Schema the encoder was fitted for
    schema: FeatureSchema,

    /// Sorted category list per feature (empty for numeric features)
    categories: Vec<Vec<String>>,

    /// Observed range per feature (None for categorical features)
    ranges: Vec<Option<ValueRange>>,

    /// Sorted class labels, index = class id
    classes: Vec<String>,
}

impl FeatureEncoder {
    /// Fit the encoder on a loaded table
    pub fn fit(table: &TrainingTable) -> MlResult<Self> {
        let schema = table.schema.clone();
        let n_features = schema.len();

        let mut categories: Vec<BTreeSet<String>> = vec![BTreeSet::new(); n_features];
        let mut ranges: Vec<Option<ValueRange>> = vec![None; n_features];

        for (row_idx, record) in table.records.iter().enumerate() {
            if record.values.len() != n_features {
                return Err(MlError::DataFormat(format!(
                    "row {}: expected {} values, found {}",
                    row_idx + 1,
                    n_features,
                    record.values.len()
                )));
            }

            for (idx, value) in record.values.iter().enumerate() {
                match value {
                    FeatureValue::Number(v) => {
                        let range = ranges[idx].get_or_insert(ValueRange { min: *v, max: *v });
                        range.min = range.min.min(*v);
                        range.max = range.max.max(*v);
                    }
                    FeatureValue::Category(c) => {
                        categories[idx].insert(c.clone());
                    }
                }
            }
        }

        let classes = table.labels().into_iter().map(str::to_string).collect();

        Ok(Self {
            schema,
            categories: categories
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect(),
            ranges,
            classes,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn n_features(&self) -> usize {
        self.schema.len()
    }

    /// Observed range of a numeric feature
    pub fn range(&self, key: &str) -> Option<ValueRange> {
        self.schema.position(key).and_then(|idx| self.ranges[idx])
    }

    /// Known categories of a categorical feature
    pub fn categories(&self, key: &str) -> &[String] {
        self.schema
            .position(key)
            .map(|idx| self.categories[idx].as_slice())
            .unwrap_or(&[])
    }

    /// Class id of a label
    pub fn encode_label(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    /// Label of a class id
    pub fn decode_label(&self, class: usize) -> Option<&str> {
        self.classes.get(class).map(String::as_str)
    }

    /// Encode typed values in schema order
    pub fn transform(&self, values: &[FeatureValue]) -> MlResult<Vec<f64>> {
        if values.len() != self.n_features() {
            return Err(MlError::Inference(format!(
                "expected {} feature values, got {}",
                self.n_features(),
                values.len()
            )));
        }

        values
            .iter()
            .enumerate()
            .map(|(idx, value)| match value {
                FeatureValue::Number(v) => Ok(*v),
                FeatureValue::Category(c) => self.categories[idx]
                    .binary_search(c)
                    .map(|code| code as f64)
                    .map_err(|_| {
                        MlError::Inference(format!(
                            "unknown category '{}' for '{}'",
                            c, self.schema.features[idx].key
                        ))
                    }),
            })
            .collect()
    }

    /// Encode the whole table into a feature matrix and class ids
    pub fn transform_table(&self, table: &TrainingTable) -> MlResult<(Array2<f64>, Vec<usize>)> {
        let n_samples = table.len();
        let n_features = self.n_features();
        let mut features = Array2::zeros((n_samples, n_features));
        let mut labels = Vec::with_capacity(n_samples);

        for (i, record) in table.records.iter().enumerate() {
            let row = self.transform(&record.values)?;
            for (j, value) in row.into_iter().enumerate() {
                features[[i, j]] = value;
            }

            let class = self.encode_label(&record.label).ok_or_else(|| {
                MlError::Training(format!("row {}: unknown label '{}'", i + 1, record.label))
            })?;
            labels.push(class);
        }

        Ok((features, labels))
    }

    /// Validate raw request fields against the schema.
    ///
    /// Every violation is reported at once; fields outside the schema are ignored.
    pub fn parse_fields(&self, fields: &BTreeMap<String, String>) -> MlResult<Vec<FeatureValue>> {
        let mut values = Vec::with_capacity(self.n_features());
        let mut violations = Vec::new();

        for (idx, spec) in self.schema.features.iter().enumerate() {
            let raw = match fields.get(&spec.key) {
                Some(raw) => raw.trim(),
                None => {
                    violations.push(FieldViolation::new(&spec.key, "field is required"));
                    continue;
                }
            };

            if raw.is_empty() {
                violations.push(FieldViolation::new(&spec.key, "value must not be empty"));
                continue;
            }

            match spec.kind {
                FeatureKind::Numeric => match raw.parse::<f64>() {
                    Ok(v) if v.is_finite() => values.push(FeatureValue::Number(v)),
                    Ok(_) => violations.push(FieldViolation::new(
                        &spec.key,
                        "value must be a finite number",
                    )),
                    Err(_) => violations.push(FieldViolation::new(
                        &spec.key,
                        format!("'{}' is not a number", raw),
                    )),
                },
                FeatureKind::Categorical => {
                    if self.categories[idx].binary_search_by(|c| c.as_str().cmp(raw)).is_ok() {
                        values.push(FeatureValue::Category(raw.to_string()));
                    } else {
                        violations.push(FieldViolation::new(
                            &spec.key,
                            format!(
                                "'{}' is not one of: {}",
                                raw,
                                self.categories[idx].join(", ")
                            ),
                        ));
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(values)
        } else {
            Err(MlError::InputValidation(violations))
        }
    }
}
