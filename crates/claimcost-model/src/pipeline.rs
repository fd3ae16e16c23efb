//! The persisted preprocessing + regression pair.
//!
//! [`FittedPipeline`] is saved as one JSON document so the scaling
//! parameters, category vocabularies and trees can never drift apart.
//! Writes go to a sibling temp file which is synced and renamed over the
//! target.

use crate::error::{ModelError, Result};
use crate::features::{FeatureColumn, FeatureTable};
use crate::gbdt::GradientBoostedTrees;
use crate::metrics::RegressionMetrics;
use crate::preprocess::Preprocessor;
use chrono::{DateTime, Utc};
use claimcost_data::schema::LOG_ULTIMATE_CLAIM_AMOUNT;
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Artifact layout version written by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Fitted preprocessor and ensemble, trained together on the log target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    format_version: u32,
    trained_at: DateTime<Utc>,
    target: String,
    preprocessor: Preprocessor,
    model: GradientBoostedTrees,
    metrics: Option<RegressionMetrics>,
}

impl FittedPipeline {
    /// Bundle a fitted preprocessor with the model trained on its output.
    pub fn new(
        preprocessor: Preprocessor,
        model: GradientBoostedTrees,
        metrics: Option<RegressionMetrics>,
    ) -> Result<Self> {
        if preprocessor.n_outputs() != model.n_features() {
            return Err(ModelError::DimensionMismatch {
                expected: preprocessor.n_outputs(),
                actual: model.n_features(),
            });
        }

        Ok(Self {
            format_version: FORMAT_VERSION,
            trained_at: Utc::now(),
            target: LOG_ULTIMATE_CLAIM_AMOUNT.to_string(),
            preprocessor,
            model,
            metrics,
        })
    }

    /// Fitted preprocessor.
    pub const fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Fitted ensemble.
    pub const fn model(&self) -> &GradientBoostedTrees {
        &self.model
    }

    /// Held-out metrics recorded at training time.
    pub const fn metrics(&self) -> Option<&RegressionMetrics> {
        self.metrics.as_ref()
    }

    /// When the pipeline was fitted.
    pub const fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Column the model predicts.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Input columns the pipeline reads.
    pub fn input_schema(&self) -> Vec<FeatureColumn> {
        self.preprocessor.input_schema()
    }

    /// Model matrix column names.
    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    /// Select the input columns from a frame.
    pub fn features(&self, df: &DataFrame) -> Result<FeatureTable> {
        FeatureTable::select(df, &self.input_schema())
    }

    /// Model matrix for a frame.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        self.preprocessor.transform(&self.features(df)?)
    }

    /// Log-space predictions.
    pub fn predict_log(&self, df: &DataFrame) -> Result<Array1<f64>> {
        self.model.predict(&self.transform(df)?)
    }

    /// Predictions in currency units (`expm1` of the log predictions).
    pub fn predict_amounts(&self, df: &DataFrame) -> Result<Vec<f64>> {
        Ok(self.predict_log(df)?.iter().map(|v| v.exp_m1()).collect())
    }

    /// Write the artifact atomically, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = Path::new(&temp_name);

        let file = File::create(temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(temp_path, path)?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    /// Read an artifact written by [`FittedPipeline::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let pipeline: Self = serde_json::from_reader(reader)?;

        if pipeline.format_version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedFormat {
                found: pipeline.format_version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(pipeline)
    }
}
