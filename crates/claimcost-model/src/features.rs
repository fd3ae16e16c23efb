//! Model input columns.
//!
//! A [`FeatureTable`] is the ABT minus the excluded columns, with each
//! remaining column typed as numeric or categorical. Training derives the
//! schema from the frame; inference selects exactly the columns recorded at
//! fit time.

use crate::error::{ModelError, Result};
use claimcost_data::abt::{float_values, is_numeric};
use claimcost_data::schema::*;
use derive_more::Display;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Columns never used as model inputs: identifiers, raw dates, the target in
/// both forms, status and the raw severity text.
pub const DEFAULT_EXCLUDED_COLUMNS: [&str; 11] = [
    CLAIM_ID,
    POLICY_ID,
    CUSTOMER_ID,
    ACCIDENT_DATE,
    FNOL_DATE,
    POLICY_START_DATE,
    ULTIMATE_CLAIM_AMOUNT,
    LOG_ULTIMATE_CLAIM_AMOUNT,
    STATUS,
    TP_ID,
    TP_INJURY_SEVERITY,
];

/// Default exclusion list as owned strings, for configuration structs.
pub fn default_excluded_columns() -> Vec<String> {
    DEFAULT_EXCLUDED_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// How a feature column is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Standardized number.
    #[display("numeric")]
    Numeric,
    /// One-hot encoded text.
    #[display("categorical")]
    Categorical,
}

/// Name and kind of one input column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    /// Column name in the ABT.
    pub name: String,
    /// Encoding kind.
    pub kind: FeatureKind,
}

impl FeatureColumn {
    /// Numeric column.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Numeric,
        }
    }

    /// Categorical column.
    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Categorical,
        }
    }
}

/// Values of one feature column.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValues {
    /// Numbers, missing as NaN.
    Numeric(Vec<f64>),
    /// Category labels, missing as `None`.
    Categorical(Vec<Option<String>>),
}

impl FeatureValues {
    /// Kind of the values.
    pub const fn kind(&self) -> FeatureKind {
        match self {
            Self::Numeric(_) => FeatureKind::Numeric,
            Self::Categorical(_) => FeatureKind::Categorical,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, rows: &[usize]) -> Self {
        match self {
            Self::Numeric(v) => Self::Numeric(rows.iter().map(|&i| v[i]).collect()),
            Self::Categorical(v) => Self::Categorical(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// Typed feature columns, in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    schema: Vec<FeatureColumn>,
    columns: Vec<FeatureValues>,
    n_rows: usize,
}

impl FeatureTable {
    /// Drop `excluded` columns and classify the rest by dtype.
    ///
    /// Text columns become categorical and numeric columns numeric; columns of
    /// any other dtype are skipped.
    pub fn from_frame(df: &DataFrame, excluded: &[String]) -> Result<Self> {
        let mut schema = Vec::new();
        for column in df.get_columns() {
            let name = column.name().as_str();
            if excluded.iter().any(|e| e == name) {
                continue;
            }

            match column.dtype() {
                DataType::String => schema.push(FeatureColumn::categorical(name)),
                dt if is_numeric(dt) => schema.push(FeatureColumn::numeric(name)),
                dt => debug!("Ignoring column {name} with unsupported dtype {dt}"),
            }
        }

        Self::select(df, &schema)
    }

    /// Extract exactly the given columns, coercing each to its recorded kind.
    pub fn select(df: &DataFrame, schema: &[FeatureColumn]) -> Result<Self> {
        let mut columns = Vec::with_capacity(schema.len());
        for feature in schema {
            let column = df
                .column(&feature.name)
                .map_err(|_| ModelError::MissingFeature(feature.name.clone()))?;

            let values = match feature.kind {
                FeatureKind::Numeric => {
                    if !is_numeric(column.dtype()) {
                        return Err(ModelError::FeatureKindMismatch {
                            column: feature.name.clone(),
                            expected: FeatureKind::Numeric.to_string(),
                            actual: column.dtype().to_string(),
                        });
                    }
                    FeatureValues::Numeric(float_values(df, &feature.name)?)
                }
                FeatureKind::Categorical => {
                    let text = column.cast(&DataType::String)?;
                    FeatureValues::Categorical(
                        text.str()?
                            .into_iter()
                            .map(|v| v.map(str::to_string))
                            .collect(),
                    )
                }
            };
            columns.push(values);
        }

        Ok(Self {
            schema: schema.to_vec(),
            columns,
            n_rows: df.height(),
        })
    }

    /// Build from already-extracted columns.
    pub fn from_columns(columns: Vec<(String, FeatureValues)>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, |(_, v)| v.len());
        if let Some((_, bad)) = columns.iter().find(|(_, v)| v.len() != n_rows) {
            return Err(ModelError::DimensionMismatch {
                expected: n_rows,
                actual: bad.len(),
            });
        }

        let (schema, columns) = columns
            .into_iter()
            .map(|(name, values)| {
                let column = FeatureColumn {
                    name,
                    kind: values.kind(),
                };
                (column, values)
            })
            .unzip();

        Ok(Self {
            schema,
            columns,
            n_rows,
        })
    }

    /// Column names and kinds.
    pub fn schema(&self) -> &[FeatureColumn] {
        &self.schema
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema.iter().map(|c| c.name.clone()).collect()
    }

    /// Number of rows.
    pub const fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.schema.len()
    }

    /// Values of the named column.
    pub fn column(&self, name: &str) -> Option<&FeatureValues> {
        self.schema
            .iter()
            .position(|c| c.name == name)
            .map(|i| &self.columns[i])
    }

    /// Subset of rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            schema: self.schema.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            n_rows: rows.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!(
            "Claim_ID" => ["C1", "C2"],
            "Claim_Type" => [Some("Theft"), None],
            "Age_of_Driver" => [Some(30i64), None],
            "Is_Commercial" => [true, false],
            "Ultimate_Claim_Amount" => [100.0, 200.0],
            "Log_Ultimate_Claim_Amount" => [100.0_f64.ln_1p(), 200.0_f64.ln_1p()]
        )
        .unwrap()
    }

    #[test]
    fn test_classification_and_exclusion() {
        let table = FeatureTable::from_frame(&frame(), &default_excluded_columns()).unwrap();

        assert_eq!(
            table.schema(),
            &[
                FeatureColumn::categorical("Claim_Type"),
                FeatureColumn::numeric("Age_of_Driver"),
            ]
        );
        assert_eq!(table.n_rows(), 2);
    }

    #[test]
    fn test_missing_values() {
        let table = FeatureTable::from_frame(&frame(), &default_excluded_columns()).unwrap();

        let Some(FeatureValues::Numeric(ages)) = table.column("Age_of_Driver") else {
            panic!("expected numeric ages");
        };
        assert_eq!(ages[0], 30.0);
        assert!(ages[1].is_nan());

        let Some(FeatureValues::Categorical(types)) = table.column("Claim_Type") else {
            panic!("expected categorical claim types");
        };
        assert_eq!(types, &vec![Some("Theft".to_string()), None]);
    }

    #[test]
    fn test_select_missing_column() {
        let schema = vec![FeatureColumn::numeric("Vehicle_Age")];
        let err = FeatureTable::select(&frame(), &schema).unwrap_err();
        assert!(matches!(err, ModelError::MissingFeature(ref c) if c == "Vehicle_Age"));
    }

    #[test]
    fn test_select_kind_mismatch() {
        let schema = vec![FeatureColumn::numeric("Claim_Type")];
        let err = FeatureTable::select(&frame(), &schema).unwrap_err();
        assert!(matches!(err, ModelError::FeatureKindMismatch { .. }));
    }

    #[test]
    fn test_take_rows() {
        let table = FeatureTable::from_frame(&frame(), &default_excluded_columns()).unwrap();
        let subset = table.take_rows(&[1]);
        assert_eq!(subset.n_rows(), 1);
        assert_eq!(
            subset.column("Claim_Type"),
            Some(&FeatureValues::Categorical(vec![None]))
        );
    }

    #[test]
    fn test_feature_kind_display() {
        assert_eq!(FeatureKind::Numeric.to_string(), "numeric");
        assert_eq!(FeatureKind::Categorical.to_string(), "categorical");
    }
}
