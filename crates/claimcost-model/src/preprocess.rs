//! Column preprocessing: standard scaling and one-hot encoding.
//!
//! The fitted [`Preprocessor`] owns every piece of state needed to map a
//! [`FeatureTable`] to the model matrix: the input schema, per-column scaling
//! parameters and per-column category vocabularies. Output columns are the
//! numeric inputs in table order followed by one indicator per learned
//! category of each categorical input.

use crate::error::{ModelError, Result};
use crate::features::{FeatureColumn, FeatureKind, FeatureTable, FeatureValues};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Learned mean and scale of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Input column.
    pub column: String,
    /// Mean of the observed training values.
    pub mean: f64,
    /// Population standard deviation, or 1 when the column is constant.
    pub scale: f64,
}

impl StandardScaler {
    /// Learn mean and scale, ignoring NaN.
    pub fn fit(column: impl Into<String>, values: &[f64]) -> Self {
        let observed: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let n = observed.len() as f64;

        let (mean, scale) = if observed.is_empty() {
            (0.0, 1.0)
        } else {
            let mean = observed.iter().sum::<f64>() / n;
            let variance = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            (mean, if std > 0.0 { std } else { 1.0 })
        };

        Self {
            column: column.into(),
            mean,
            scale,
        }
    }

    /// Standardize one value; NaN stays NaN.
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// Learned vocabulary of one categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Input column.
    pub column: String,
    /// Sorted distinct non-null training categories.
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    /// Learn the sorted vocabulary of non-null values.
    pub fn fit(column: impl Into<String>, values: &[Option<String>]) -> Self {
        let categories: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
        Self {
            column: column.into(),
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    /// Indicator position of a value; `None` for nulls and unseen categories.
    pub fn position(&self, value: Option<&str>) -> Option<usize> {
        value.and_then(|v| {
            self.categories
                .binary_search_by(|c| c.as_str().cmp(v))
                .ok()
        })
    }

    /// Output feature names, `{column}_{category}`.
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }
}

/// Fitted numeric scaling plus categorical encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    numeric: Vec<StandardScaler>,
    categorical: Vec<OneHotEncoder>,
}

impl Preprocessor {
    /// Learn scaling parameters and vocabularies from training rows.
    pub fn fit(table: &FeatureTable) -> Result<Self> {
        if table.n_rows() == 0 {
            return Err(ModelError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        for feature in table.schema() {
            match table.column(&feature.name) {
                Some(FeatureValues::Numeric(values)) => {
                    numeric.push(StandardScaler::fit(&feature.name, values));
                }
                Some(FeatureValues::Categorical(values)) => {
                    categorical.push(OneHotEncoder::fit(&feature.name, values));
                }
                None => return Err(ModelError::MissingFeature(feature.name.clone())),
            }
        }

        Ok(Self {
            numeric,
            categorical,
        })
    }

    /// Map a table to the model matrix, one row per input row.
    ///
    /// Categories not seen at fit time, and nulls, produce an all-zero
    /// indicator block.
    pub fn transform(&self, table: &FeatureTable) -> Result<Array2<f64>> {
        let mut out = Array2::<f64>::zeros((table.n_rows(), self.n_outputs()));

        for (j, scaler) in self.numeric.iter().enumerate() {
            let values = match table.column(&scaler.column) {
                Some(FeatureValues::Numeric(v)) => v,
                Some(other) => return Err(kind_mismatch(&scaler.column, FeatureKind::Numeric, other)),
                None => return Err(ModelError::MissingFeature(scaler.column.clone())),
            };
            for (i, &v) in values.iter().enumerate() {
                out[[i, j]] = scaler.transform(v);
            }
        }

        let mut offset = self.numeric.len();
        for encoder in &self.categorical {
            let values = match table.column(&encoder.column) {
                Some(FeatureValues::Categorical(v)) => v,
                Some(other) => {
                    return Err(kind_mismatch(&encoder.column, FeatureKind::Categorical, other));
                }
                None => return Err(ModelError::MissingFeature(encoder.column.clone())),
            };
            for (i, v) in values.iter().enumerate() {
                if let Some(k) = encoder.position(v.as_deref()) {
                    out[[i, offset + k]] = 1.0;
                }
            }
            offset += encoder.categories.len();
        }

        Ok(out)
    }

    /// Number of model matrix columns.
    pub fn n_outputs(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|e| e.categories.len()).sum::<usize>()
    }

    /// Names of the model matrix columns, in order.
    pub fn feature_names(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|s| s.column.clone())
            .chain(self.categorical.iter().flat_map(OneHotEncoder::feature_names))
            .collect()
    }

    /// Input columns the preprocessor expects.
    pub fn input_schema(&self) -> Vec<FeatureColumn> {
        self.numeric
            .iter()
            .map(|s| FeatureColumn::numeric(&s.column))
            .chain(
                self.categorical
                    .iter()
                    .map(|e| FeatureColumn::categorical(&e.column)),
            )
            .collect()
    }

    /// Numeric scalers, in output order.
    pub fn scalers(&self) -> &[StandardScaler] {
        &self.numeric
    }

    /// Categorical encoders, in output order.
    pub fn encoders(&self) -> &[OneHotEncoder] {
        &self.categorical
    }
}

fn kind_mismatch(column: &str, expected: FeatureKind, actual: &FeatureValues) -> ModelError {
    ModelError::FeatureKindMismatch {
        column: column.to_string(),
        expected: expected.to_string(),
        actual: actual.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table(ages: Vec<f64>, types: Vec<Option<&str>>) -> FeatureTable {
        FeatureTable::from_columns(vec![
            ("Age_of_Driver".to_string(), FeatureValues::Numeric(ages)),
            (
                "Claim_Type".to_string(),
                FeatureValues::Categorical(types.into_iter().map(|t| t.map(str::to_string)).collect()),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_scaler_population_std() {
        let scaler = StandardScaler::fit("x", &[1.0, 3.0, f64::NAN]);
        assert_relative_eq!(scaler.mean, 2.0);
        assert_relative_eq!(scaler.scale, 1.0);
        assert_relative_eq!(scaler.transform(3.0), 1.0);
        assert!(scaler.transform(f64::NAN).is_nan());
    }

    #[test]
    fn test_scaler_constant_column() {
        let scaler = StandardScaler::fit("x", &[5.0, 5.0]);
        assert_eq!(scaler.scale, 1.0);
        assert_eq!(scaler.transform(5.0), 0.0);
    }

    #[test]
    fn test_encoder_vocabulary_is_sorted() {
        let encoder = OneHotEncoder::fit(
            "Claim_Type",
            &[
                Some("Theft".to_string()),
                Some("Collision".to_string()),
                None,
                Some("Theft".to_string()),
            ],
        );
        assert_eq!(encoder.categories, vec!["Collision", "Theft"]);
        assert_eq!(encoder.feature_names(), vec!["Claim_Type_Collision", "Claim_Type_Theft"]);
        assert_eq!(encoder.position(Some("Theft")), Some(1));
        assert_eq!(encoder.position(Some("Fire")), None);
        assert_eq!(encoder.position(None), None);
    }

    #[test]
    fn test_transform_layout() {
        let train = table(vec![20.0, 40.0], vec![Some("Theft"), Some("Collision")]);
        let pre = Preprocessor::fit(&train).unwrap();

        assert_eq!(
            pre.feature_names(),
            vec!["Age_of_Driver", "Claim_Type_Collision", "Claim_Type_Theft"]
        );

        let x = pre.transform(&train).unwrap();
        assert_eq!(x.dim(), (2, 3));
        assert_relative_eq!(x[[0, 0]], -1.0);
        assert_relative_eq!(x[[1, 0]], 1.0);
        assert_eq!(&x.row(0).to_vec()[1..], &[0.0, 1.0]);
        assert_eq!(&x.row(1).to_vec()[1..], &[1.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_maps_to_zeros() {
        let train = table(vec![20.0, 40.0], vec![Some("Theft"), Some("Collision")]);
        let pre = Preprocessor::fit(&train).unwrap();

        let new = table(vec![30.0, 30.0], vec![Some("Flood"), None]);
        let x = pre.transform(&new).unwrap();
        assert_eq!(&x.row(0).to_vec()[1..], &[0.0, 0.0]);
        assert_eq!(&x.row(1).to_vec()[1..], &[0.0, 0.0]);
    }

    #[test]
    fn test_transform_rejects_missing_column() {
        let train = table(vec![20.0, 40.0], vec![Some("Theft"), Some("Collision")]);
        let pre = Preprocessor::fit(&train).unwrap();

        let partial = FeatureTable::from_columns(vec![(
            "Age_of_Driver".to_string(),
            FeatureValues::Numeric(vec![1.0]),
        )])
        .unwrap();
        assert!(matches!(
            pre.transform(&partial).unwrap_err(),
            ModelError::MissingFeature(ref c) if c == "Claim_Type"
        ));
    }
}
