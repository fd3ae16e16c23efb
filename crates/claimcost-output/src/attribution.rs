//! Global cost-driver ranking from per-row attributions.
//!
//! A feature's importance is the mean absolute attribution over all rows.
//! Features are ranked by importance, descending; equal importances keep the
//! model's feature order.

use crate::error::{OutputError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Mean absolute attribution of one model feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureAttribution {
    /// Model matrix column name.
    pub feature: String,

    /// Mean of |attribution| over all rows.
    pub mean_abs_attribution: f64,
}

impl FeatureAttribution {
    /// Create a new feature attribution.
    ///
    /// # Examples
    ///
    /// ```
    /// use claimcost_output::FeatureAttribution;
    ///
    /// let driver = FeatureAttribution::new("TP_Severity_Score".to_string(), 0.41237);
    /// assert_eq!(driver.to_string(), "TP_Severity_Score: 0.4124");
    /// ```
    pub const fn new(feature: String, mean_abs_attribution: f64) -> Self {
        Self {
            feature,
            mean_abs_attribution,
        }
    }
}

impl fmt::Display for FeatureAttribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.4}", self.feature, self.mean_abs_attribution)
    }
}

/// All features ranked by mean absolute attribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverRanking {
    /// Features, most important first.
    pub drivers: Vec<FeatureAttribution>,
}

impl DriverRanking {
    /// Rank the columns of an attribution matrix (rows × features).
    pub fn from_attributions(feature_names: &[String], attributions: &Array2<f64>) -> Result<Self> {
        if attributions.ncols() != feature_names.len() {
            return Err(OutputError::DimensionMismatch {
                expected: feature_names.len(),
                actual: attributions.ncols(),
            });
        }

        let n_rows = attributions.nrows().max(1) as f64;
        let mut drivers: Vec<FeatureAttribution> = feature_names
            .iter()
            .zip(attributions.columns())
            .map(|(name, column)| {
                let mean_abs = column.iter().map(|v| v.abs()).sum::<f64>() / n_rows;
                FeatureAttribution::new(name.clone(), mean_abs)
            })
            .collect();

        // Stable: ties keep feature order.
        drivers.sort_by(|a, b| {
            b.mean_abs_attribution
                .partial_cmp(&a.mean_abs_attribution)
                .unwrap_or(Ordering::Equal)
        });

        Ok(Self { drivers })
    }

    /// The `n` most important features.
    pub fn top(&self, n: usize) -> &[FeatureAttribution] {
        &self.drivers[..n.min(self.drivers.len())]
    }

    /// Number of ranked features.
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Whether there are no features.
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Position of a feature in the model matrix, by name.
    pub fn column_index(feature_names: &[String], feature: &str) -> Option<usize> {
        feature_names.iter().position(|n| n == feature)
    }
}
