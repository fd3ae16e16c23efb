//! End-to-end model training from the ABT.

use crate::error::{ModelError, Result};
use crate::features::{FeatureKind, FeatureTable, default_excluded_columns};
use crate::gbdt::{GbdtConfig, GbdtTrainer};
use crate::metrics::RegressionMetrics;
use crate::pipeline::FittedPipeline;
use crate::preprocess::Preprocessor;
use crate::split::{TrainTestSplit, train_test_split};
use claimcost_data::Abt;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Boosting hyperparameters.
    pub gbdt: GbdtConfig,

    /// Held-out share of rows (default: 0.2)
    pub test_fraction: f64,

    /// Seed for the train/test shuffle (default: 42)
    pub split_seed: u64,

    /// ABT columns never used as features.
    pub excluded_columns: Vec<String>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            gbdt: GbdtConfig::default(),
            test_fraction: 0.2,
            split_seed: 42,
            excluded_columns: default_excluded_columns(),
        }
    }
}

/// Result of a training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// The fitted artifact.
    pub pipeline: FittedPipeline,
    /// Row assignment used.
    pub split: TrainTestSplit,
    /// Held-out accuracy in currency units.
    pub metrics: RegressionMetrics,
}

/// Fits a [`FittedPipeline`] on an ABT.
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainerConfig,
}

impl ModelTrainer {
    /// Create a trainer with a custom configuration.
    pub const fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Trainer configuration.
    pub const fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Feature columns the trainer would use for this ABT.
    pub fn feature_table(&self, abt: &Abt) -> Result<FeatureTable> {
        let table = FeatureTable::from_frame(abt.frame(), &self.config.excluded_columns)?;
        if table.n_columns() == 0 {
            return Err(ModelError::NoFeatures {
                excluded: self.config.excluded_columns.len(),
            });
        }
        Ok(table)
    }

    /// Split, fit, evaluate.
    pub fn train(&self, abt: &Abt) -> Result<TrainingOutcome> {
        self.train_with_progress(abt, |_, _| {})
    }

    /// Same as [`ModelTrainer::train`], reporting each boosting round.
    pub fn train_with_progress<F>(&self, abt: &Abt, progress: F) -> Result<TrainingOutcome>
    where
        F: FnMut(usize, usize),
    {
        let features = self.feature_table(abt)?;
        let names_of = |kind: FeatureKind| -> Vec<String> {
            features
                .schema()
                .iter()
                .filter(|c| c.kind == kind)
                .map(|c| c.name.clone())
                .collect()
        };
        info!("Categorical features: {:?}", names_of(FeatureKind::Categorical));
        info!("Numeric features: {:?}", names_of(FeatureKind::Numeric));

        let log_target = abt.log_target()?;
        let target = abt.target()?;
        let split = train_test_split(abt.height(), self.config.test_fraction, self.config.split_seed)?;
        info!(
            train = split.train.len(),
            test = split.test.len(),
            "Split rows"
        );

        let train_table = features.take_rows(&split.train);
        let preprocessor = Preprocessor::fit(&train_table)?;
        let x_train = preprocessor.transform(&train_table)?;
        let y_train: Vec<f64> = split.train.iter().map(|&i| log_target[i]).collect();

        info!("Training model...");
        let model = GbdtTrainer::new(self.config.gbdt.clone())?
            .fit_with_progress(&x_train, &y_train, progress)?;

        info!("Evaluating model...");
        let x_test = preprocessor.transform(&features.take_rows(&split.test))?;
        let predicted: Vec<f64> = model.predict(&x_test)?.iter().map(|v| v.exp_m1()).collect();
        let actual: Vec<f64> = split.test.iter().map(|&i| target[i]).collect();
        let metrics = RegressionMetrics::from_amounts(&actual, &predicted)?;

        info!("RMSE: {:.2}", metrics.rmse);
        info!("MAPE: {:.2}%", metrics.mape * 100.0);

        let pipeline = FittedPipeline::new(preprocessor, model, Some(metrics))?;
        Ok(TrainingOutcome {
            pipeline,
            split,
            metrics,
        })
    }
}
