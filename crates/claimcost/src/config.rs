//! Pipeline configuration.
//!
//! Every field has a default, so a JSON file only needs to name what it
//! overrides:
//!
//! ```json
//! {
//!   "trainer": { "gbdt": { "n_estimators": 200 } },
//!   "compliance": { "prohibited_attributes": ["Race", "Religion", "Gender"] },
//!   "paths": { "report": "out/report.md" }
//! }
//! ```

use crate::error::Result;
use claimcost_data::{DatasetConfig, RawPaths};
use claimcost_model::TrainerConfig;
use claimcost_output::ComplianceConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Locations of every file the pipeline reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelinePaths {
    /// Raw CSV extracts.
    pub raw: RawPaths,
    /// Analytical base table.
    pub abt: PathBuf,
    /// Fitted pipeline artifact.
    pub model: PathBuf,
    /// Markdown compliance report.
    pub report: PathBuf,
    /// Attribution summary plot.
    pub figure: PathBuf,
    /// Full feature ranking.
    pub feature_importance: PathBuf,
    /// Held-out metrics.
    pub metrics: PathBuf,
}

impl Default for PipelinePaths {
    fn default() -> Self {
        Self {
            raw: RawPaths::default(),
            abt: PathBuf::from("data/processed/abt.csv"),
            model: PathBuf::from("src/models/model.json"),
            report: PathBuf::from("reports/compliance_report.md"),
            figure: PathBuf::from(claimcost_output::DEFAULT_FIGURE_PATH),
            feature_importance: PathBuf::from("reports/feature_importance.csv"),
            metrics: PathBuf::from("reports/metrics.json"),
        }
    }
}

impl PipelinePaths {
    /// Default layout rooted at `root` instead of the working directory.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let defaults = Self::default();
        Self {
            raw: RawPaths::in_dir(root.join("data").join("raw")),
            abt: root.join(defaults.abt),
            model: root.join(defaults.model),
            report: root.join(defaults.report),
            figure: root.join(defaults.figure),
            feature_importance: root.join(defaults.feature_importance),
            metrics: root.join(defaults.metrics),
        }
    }
}

/// Configuration of all three stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dataset builder settings.
    pub dataset: DatasetConfig,
    /// Feature selection, split and boosting settings.
    pub trainer: TrainerConfig,
    /// Prohibited attributes and report layout.
    pub compliance: ComplianceConfig,
    /// File locations.
    pub paths: PipelinePaths,
}

impl PipelineConfig {
    /// Read a (possibly partial) JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = PipelinePaths::default();
        assert_eq!(paths.abt, PathBuf::from("data/processed/abt.csv"));
        assert_eq!(paths.model, PathBuf::from("src/models/model.json"));
        assert_eq!(
            paths.figure,
            PathBuf::from("reports/figures/shap_summary_plot.png")
        );
        assert_eq!(paths.raw.claims, PathBuf::from("data/raw/claims.csv"));
    }

    #[test]
    fn test_rooted_paths() {
        let paths = PipelinePaths::rooted_at("/tmp/run");
        assert_eq!(paths.report, PathBuf::from("/tmp/run/reports/compliance_report.md"));
        assert_eq!(
            paths.raw.third_party,
            PathBuf::from("/tmp/run/data/raw/third_party.csv")
        );
    }

    #[test]
    fn test_partial_json_overrides_only_named_fields() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "trainer": { "gbdt": { "n_estimators": 7 } },
                "compliance": { "prohibited_attributes": ["Gender"] },
                "paths": { "report": "out/report.md" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.trainer.gbdt.n_estimators, 7);
        assert_eq!(config.trainer.test_fraction, 0.2);
        assert_eq!(config.compliance.prohibited_attributes, vec!["Gender"]);
        assert_eq!(config.compliance.top_drivers, 5);
        assert_eq!(config.paths.report, PathBuf::from("out/report.md"));
        assert_eq!(config.paths.model, PathBuf::from("src/models/model.json"));
        assert_eq!(config.dataset, DatasetConfig::default());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"trainer": {"split_seed": 7}}"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.trainer.split_seed, 7);

        fs::write(&path, "not json").unwrap();
        assert!(PipelineConfig::from_json_file(&path).is_err());
    }
}
