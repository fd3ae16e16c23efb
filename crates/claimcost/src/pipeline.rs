//! The three pipeline stages.
//!
//! Each stage exists twice: an in-memory form taking and returning typed
//! values, and a `run_*` form that reads its inputs from and writes its
//! outputs to the configured [`PipelinePaths`](crate::PipelinePaths).

use crate::config::PipelineConfig;
use crate::error::Result;
use claimcost_data::{Abt, BuildSummary, DatasetBuilder, RawTables};
use claimcost_model::{FittedPipeline, ModelTrainer, TrainingOutcome, TreeExplainer};
use claimcost_output::{
    ComplianceReport, ComplianceVerdict, DriverRanking, ExportFormat, Exporter,
    FeatureAttribution, MetricsExport, ReportBuilder, SummaryPlot, check_compliance,
};
use ndarray::Array2;
use tracing::{info, warn};

/// Attributions and compliance outcome for one fitted model over one ABT.
#[derive(Debug, Clone)]
pub struct ExplainabilityReport {
    /// Model matrix column names.
    pub feature_names: Vec<String>,
    /// Model matrix the attributions explain (rows × features).
    pub features: Array2<f64>,
    /// Per-row, per-feature attributions in log space.
    pub attributions: Array2<f64>,
    /// Expected model output the attributions are relative to.
    pub base_value: f64,
    /// All features by mean |attribution|.
    pub ranking: DriverRanking,
    /// Verdict plus top drivers.
    pub report: ComplianceReport,
}

impl ExplainabilityReport {
    /// Prohibited-attribute check outcome.
    pub const fn verdict(&self) -> &ComplianceVerdict {
        &self.report.verdict
    }

    /// Drivers listed in the report.
    pub fn top_drivers(&self) -> &[FeatureAttribution] {
        &self.report.drivers
    }
}

/// Everything produced by [`ClaimCostPipeline::run_all`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Dataset build effects.
    pub build: BuildSummary,
    /// Fitted model, split and held-out metrics.
    pub training: TrainingOutcome,
    /// Attributions and compliance report.
    pub explanation: ExplainabilityReport,
}

/// Dataset build, training and explanation under one configuration.
#[derive(Debug, Clone, Default)]
pub struct ClaimCostPipeline {
    config: PipelineConfig,
}

impl ClaimCostPipeline {
    /// Create a pipeline with a custom configuration.
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Pipeline configuration.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Join, clean and enrich the raw tables into an ABT.
    pub fn build_dataset(&self, raw: &RawTables) -> Result<(Abt, BuildSummary)> {
        Ok(DatasetBuilder::with_config(self.config.dataset.clone()).build(raw)?)
    }

    /// Fit and evaluate a model on the ABT.
    pub fn train<F>(&self, abt: &Abt, progress: F) -> Result<TrainingOutcome>
    where
        F: FnMut(usize, usize),
    {
        Ok(ModelTrainer::new(self.config.trainer.clone()).train_with_progress(abt, progress)?)
    }

    /// Screen the feature set and attribute every ABT row's prediction.
    pub fn explain(&self, fitted: &FittedPipeline, abt: &Abt) -> Result<ExplainabilityReport> {
        let excluded = &self.config.trainer.excluded_columns;
        let candidates: Vec<String> = abt
            .column_names()
            .into_iter()
            .filter(|c| !excluded.contains(c))
            .collect();

        info!("Checking for prohibited variables...");
        let verdict = check_compliance(&candidates, &self.config.compliance);
        match &verdict {
            ComplianceVerdict::Pass => info!("Compliance check: PASS"),
            ComplianceVerdict::Warning(found) => {
                warn!("Compliance check: prohibited variables in features: {:?}", found)
            }
        }

        info!("Calculating SHAP values...");
        let features = fitted.transform(abt.frame())?;
        let explainer = TreeExplainer::new(fitted.model());
        let attributions = explainer.shap_values(&features)?;
        let feature_names = fitted.feature_names();

        let ranking = DriverRanking::from_attributions(&feature_names, &attributions)?;
        let top = ranking.top(self.config.compliance.top_drivers);
        for driver in top {
            info!("Driver {}", driver);
        }

        let report = ReportBuilder::new()
            .verdict(verdict)
            .drivers(top)
            .figure_path(&self.config.paths.figure)
            .build();

        Ok(ExplainabilityReport {
            feature_names,
            features,
            attributions,
            base_value: explainer.expected_value(),
            ranking,
            report,
        })
    }

    /// Read the raw CSVs, build the ABT and write it.
    pub fn run_build_dataset(&self) -> Result<BuildSummary> {
        let paths = &self.config.paths;
        let raw = RawTables::load(&paths.raw)?;
        let (abt, summary) = self.build_dataset(&raw)?;
        abt.write_csv(&paths.abt)?;
        info!("ABT saved to {}", paths.abt.display());
        Ok(summary)
    }

    /// Read the ABT, train, then write the model artifact and metrics.
    pub fn run_train<F>(&self, progress: F) -> Result<TrainingOutcome>
    where
        F: FnMut(usize, usize),
    {
        let paths = &self.config.paths;
        let abt = Abt::read_csv(&paths.abt)?;
        let outcome = self.train(&abt, progress)?;

        outcome.pipeline.save(&paths.model)?;
        let metrics = MetricsExport {
            rmse: outcome.metrics.rmse,
            mape: outcome.metrics.mape,
            n_samples: outcome.metrics.n_samples,
            trained_at: outcome.pipeline.trained_at(),
        };
        metrics.export_to_file(&paths.metrics, ExportFormat::PrettyJson)?;

        Ok(outcome)
    }

    /// Read the ABT and model artifact, then write the report, plot and
    /// feature ranking.
    pub fn run_explain(&self) -> Result<ExplainabilityReport> {
        let paths = &self.config.paths;
        let abt = Abt::read_csv(&paths.abt)?;
        let fitted = FittedPipeline::load(&paths.model)?;
        let explanation = self.explain(&fitted, &abt)?;

        info!("Generating summary plot...");
        SummaryPlot::new(
            &explanation.feature_names,
            &explanation.attributions,
            &explanation.features,
        )?
        .render(
            explanation.top_drivers(),
            &paths.figure,
            self.config.compliance.figure_width,
            self.config.compliance.figure_height,
        )?;

        explanation.report.write(&paths.report)?;
        explanation
            .ranking
            .export_to_file(&paths.feature_importance, ExportFormat::Csv)?;

        Ok(explanation)
    }

    /// All three stages in order.
    pub fn run_all<F>(&self, progress: F) -> Result<RunOutcome>
    where
        F: FnMut(usize, usize),
    {
        let build = self.run_build_dataset()?;
        let training = self.run_train(progress)?;
        let explanation = self.run_explain()?;
        Ok(RunOutcome {
            build,
            training,
            explanation,
        })
    }
}
