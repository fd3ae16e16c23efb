//! Held-out evaluation in currency units.
//!
//! The model predicts `ln(1 + amount)`. Predictions are mapped back with
//! `expm1` and compared with the original claim amounts, so the reported
//! error is in currency units.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Regression accuracy on the held-out rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute percentage error, as a fraction.
    pub mape: f64,
    /// Number of rows evaluated.
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compare predictions with targets, both already in currency units.
    pub fn from_amounts(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(ModelError::DimensionMismatch {
                expected: actual.len(),
                actual: predicted.len(),
            });
        }
        if actual.is_empty() {
            return Err(ModelError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        Ok(Self {
            rmse: rmse(actual, predicted),
            mape: mape(actual, predicted),
            n_samples: actual.len(),
        })
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RMSE: {:.2}, MAPE: {:.2}% (n = {})",
            self.rmse,
            self.mape * 100.0,
            self.n_samples
        )
    }
}

/// Root mean squared error.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    (sse / n).sqrt()
}

/// Mean absolute percentage error as a fraction; the denominator is floored
/// at machine epsilon so zero-valued targets stay finite.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs() / a.abs().max(f64::EPSILON))
        .sum::<f64>()
        / n
}
