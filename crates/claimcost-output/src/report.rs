//! The model explainability and compliance report.

use crate::attribution::FeatureAttribution;
use crate::compliance::ComplianceVerdict;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default location of the summary plot referenced by the report.
pub const DEFAULT_FIGURE_PATH: &str = "reports/figures/shap_summary_plot.png";

/// Compliance verdict plus the top cost drivers of a fitted model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceReport {
    /// Report generation timestamp.
    pub generated_at: DateTime<Utc>,

    /// Prohibited-attribute check outcome.
    pub verdict: ComplianceVerdict,

    /// Top cost drivers, most important first.
    pub drivers: Vec<FeatureAttribution>,

    /// Where the summary plot was written.
    pub figure_path: PathBuf,
}

impl ComplianceReport {
    /// Create a new report.
    pub fn new(
        verdict: ComplianceVerdict,
        drivers: Vec<FeatureAttribution>,
        figure_path: PathBuf,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            verdict,
            drivers,
            figure_path,
        }
    }

    /// Render the report as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();

        out.push_str("# Model Explainability & Compliance Report\n\n");

        out.push_str("## 1. Compliance Check\n");
        match &self.verdict {
            ComplianceVerdict::Pass => out.push_str(
                "[PASS] No prohibited variables (Race, Religion, etc.) were found in the model features.\n\n",
            ),
            ComplianceVerdict::Warning(found) => out.push_str(&format!(
                "[WARNING] The following prohibited variables were found in the model features: {}\n\n",
                found.join(", ")
            )),
        }

        out.push_str(&format!(
            "## 2. Top {} Cost Drivers (SHAP Analysis)\n",
            self.drivers.len()
        ));
        out.push_str(
            "The following features have the most significant impact on predicting claim costs:\n\n",
        );
        for driver in &self.drivers {
            out.push_str(&format!(
                "- **{}**: Average impact (SHAP value) of {:.4}\n",
                driver.feature, driver.mean_abs_attribution
            ));
        }

        out.push_str("\n## 3. Summary Visualization\n");
        out.push_str(&format!(
            "The SHAP summary plot visualizes how feature values influence the prediction \
             (driving costs up or down). You can find the plot in: `{}`.\n",
            self.figure_path.display()
        ));
        if !self.drivers.is_empty() {
            let bands: Vec<&str> = self.drivers.iter().map(|d| d.feature.as_str()).collect();
            out.push_str(&format!(
                "Plot bands, top to bottom: {}. Dots run from blue (low feature value) \
                 to red (high feature value); grey marks a missing value.\n",
                bands.join(", ")
            ));
        }

        out
    }

    /// Write the Markdown report, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(self.to_markdown().as_bytes())?;
        writer.flush()?;

        info!("Compliance report saved to {}", path.display());
        Ok(())
    }
}

/// Builder for creating compliance reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    verdict: Option<ComplianceVerdict>,
    drivers: Vec<FeatureAttribution>,
    figure_path: Option<PathBuf>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compliance verdict.
    pub fn verdict(mut self, verdict: ComplianceVerdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    /// Set the ranked drivers to list.
    pub fn drivers(mut self, drivers: &[FeatureAttribution]) -> Self {
        self.drivers = drivers.to_vec();
        self
    }

    /// Set the summary plot location.
    pub fn figure_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.figure_path = Some(path.into());
        self
    }

    /// Build the report.
    pub fn build(self) -> ComplianceReport {
        ComplianceReport::new(
            self.verdict.unwrap_or(ComplianceVerdict::Pass),
            self.drivers,
            self.figure_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FIGURE_PATH)),
        )
    }
}
