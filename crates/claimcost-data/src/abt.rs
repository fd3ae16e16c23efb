//! Analytical base table.

use crate::error::{DataError, Result};
use crate::raw::{self, require_columns};
use crate::schema::{LOG_ULTIMATE_CLAIM_AMOUNT, ULTIMATE_CLAIM_AMOUNT};
use polars::prelude::*;
use std::path::Path;

/// The denormalized, feature-engineered claim table used for training and
/// explanation.
///
/// Construction checks that the target and its log form are present and
/// that no row has a null target.
#[derive(Debug, Clone)]
pub struct Abt {
    frame: DataFrame,
}

impl Abt {
    /// Wrap a frame, validating the target invariants.
    pub fn new(frame: DataFrame) -> Result<Self> {
        require_columns(&frame, "abt", &[ULTIMATE_CLAIM_AMOUNT, LOG_ULTIMATE_CLAIM_AMOUNT])?;

        let target = frame.column(ULTIMATE_CLAIM_AMOUNT)?;
        if !is_numeric(target.dtype()) {
            return Err(DataError::UnexpectedDtype {
                column: ULTIMATE_CLAIM_AMOUNT.to_string(),
                dtype: target.dtype().to_string(),
            });
        }
        if target.null_count() > 0 {
            return Err(DataError::NullTarget {
                rows: target.null_count(),
            });
        }

        Ok(Self { frame })
    }

    /// Read a previously persisted ABT.
    pub fn read_csv(path: &Path) -> Result<Self> {
        Self::new(raw::read_csv(path)?)
    }

    /// Persist the ABT as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut frame = self.frame.clone();
        raw::write_csv(&mut frame, path)
    }

    /// Underlying frame.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Consume into the underlying frame.
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Original-unit target values.
    pub fn target(&self) -> Result<Vec<f64>> {
        float_values(&self.frame, ULTIMATE_CLAIM_AMOUNT)
    }

    /// Log-space target values.
    pub fn log_target(&self) -> Result<Vec<f64>> {
        float_values(&self.frame, LOG_ULTIMATE_CLAIM_AMOUNT)
    }
}

/// Whether a dtype is one the pipeline treats as numeric.
pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int32
            | DataType::Int64
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Column as `f64`, nulls mapped to NaN.
pub fn float_values(df: &DataFrame, column: &str) -> Result<Vec<f64>> {
    let values = df.column(column)?.cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_null_target() {
        let df = df!(
            ULTIMATE_CLAIM_AMOUNT => [Some(100.0), None],
            LOG_ULTIMATE_CLAIM_AMOUNT => [Some(100.0_f64.ln_1p()), None]
        )
        .unwrap();
        assert!(matches!(
            Abt::new(df).unwrap_err(),
            DataError::NullTarget { rows: 1 }
        ));
    }

    #[test]
    fn test_rejects_missing_log_target() {
        let df = df!(ULTIMATE_CLAIM_AMOUNT => [100.0]).unwrap();
        assert!(matches!(
            Abt::new(df).unwrap_err(),
            DataError::MissingColumn { .. }
        ));
    }

    #[test]
    fn test_target_accessors() {
        let df = df!(
            "Claim_ID" => ["C1", "C2"],
            ULTIMATE_CLAIM_AMOUNT => [100.0, 2500.0],
            LOG_ULTIMATE_CLAIM_AMOUNT => [100.0_f64.ln_1p(), 2500.0_f64.ln_1p()]
        )
        .unwrap();
        let abt = Abt::new(df).unwrap();

        assert_eq!(abt.height(), 2);
        assert_eq!(abt.target().unwrap(), vec![100.0, 2500.0]);
        assert_eq!(abt.log_target().unwrap()[1], 2500.0_f64.ln_1p());
        assert_eq!(
            abt.column_names(),
            vec!["Claim_ID", ULTIMATE_CLAIM_AMOUNT, LOG_ULTIMATE_CLAIM_AMOUNT]
        );
    }

    #[test]
    fn test_numeric_dtypes() {
        assert!(is_numeric(&DataType::Int64));
        assert!(is_numeric(&DataType::Float64));
        assert!(!is_numeric(&DataType::String));
        assert!(!is_numeric(&DataType::Boolean));
    }
}
