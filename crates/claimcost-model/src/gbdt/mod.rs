//! Gradient-boosted regression trees.
//!
//! Squared-error boosting in the XGBoost formulation: each round fits a tree
//! to the gradients `g = prediction - target` (hessian 1) with exact greedy
//! split search, L2-regularized leaf weights and a learned default direction
//! for missing values.
//!
//! Split gain for a candidate partition into L and R:
//!
//! gain = ½ · (G_L²/(H_L+λ) + G_R²/(H_R+λ) − G²/(H+λ)) − γ
//!
//! and a leaf's weight is `−G/(H+λ)` scaled by the learning rate.

pub mod trainer;
pub mod tree;

pub use trainer::GbdtTrainer;
pub use tree::{RegressionTree, TreeNode};

use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbdtConfig {
    /// Number of boosting rounds (default: 100)
    pub n_estimators: usize,

    /// Maximum tree depth (default: 6)
    pub max_depth: usize,

    /// Shrinkage applied to every leaf (default: 0.1)
    pub learning_rate: f64,

    /// L2 regularization on leaf weights (default: 1.0)
    pub lambda: f64,

    /// Minimum gain to make a split (default: 0.0)
    pub gamma: f64,

    /// Minimum hessian sum per child (default: 1.0)
    pub min_child_weight: f64,

    /// Fraction of rows sampled per tree (default: 1.0)
    pub subsample: f64,

    /// Seed for row sampling (default: 42)
    pub seed: u64,
}

impl Default for GbdtConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.1,
            lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            subsample: 1.0,
            seed: 42,
        }
    }
}

impl GbdtConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.lambda < 0.0 || self.gamma < 0.0 || self.min_child_weight < 0.0 {
            return Err(ModelError::InvalidParameter(
                "lambda, gamma and min_child_weight must be non-negative".to_string(),
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ModelError::InvalidParameter(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }
}

/// A fitted boosted ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    /// Assemble an ensemble.
    pub const fn new(base_score: f64, n_features: usize, trees: Vec<RegressionTree>) -> Self {
        Self {
            base_score,
            n_features,
            trees,
        }
    }

    /// Initial prediction before any tree.
    pub const fn base_score(&self) -> f64 {
        self.base_score
    }

    /// Width of the model matrix the ensemble was trained on.
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Fitted trees in boosting order.
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Prediction for one row.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    /// Predictions for every row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(x)?;
        Ok(x.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }

    /// Model output averaged over the training distribution of each tree.
    pub fn expected_value(&self) -> f64 {
        self.base_score + self.trees.iter().map(RegressionTree::expected_value).sum::<f64>()
    }

    pub(crate) fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features,
                actual: x.ncols(),
            });
        }
        Ok(())
    }
}
