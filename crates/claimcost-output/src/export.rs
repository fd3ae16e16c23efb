//! CSV and JSON exports of the explainability artifacts.
//!
//! The feature-importance table and the held-out metrics are written next to
//! the Markdown report so downstream tooling does not have to parse it.

use crate::attribution::DriverRanking;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// One row of the feature-importance table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureImportanceRecord {
    /// 1-based rank, 1 being the strongest driver.
    pub rank: usize,

    /// Model matrix column name.
    pub feature: String,

    /// Mean of |attribution| over all explained rows.
    pub mean_abs_shap: f64,
}

/// Held-out accuracy of a fitted model, in currency units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsExport {
    /// Root mean squared error.
    pub rmse: f64,

    /// Mean absolute percentage error, as a fraction.
    pub mape: f64,

    /// Number of held-out rows.
    pub n_samples: usize,

    /// When the model was fitted.
    pub trained_at: DateTime<Utc>,
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String>;

    /// Export data to a file in the specified format, creating parent
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<()> {
        let content = self.export_to_string(format)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        info!("Exported {} to {}", format.extension(), path.display());
        Ok(())
    }
}

fn to_csv<T: Serialize>(records: impl IntoIterator<Item = T>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

impl DriverRanking {
    /// Flatten into ranked table rows.
    pub fn to_records(&self) -> Vec<FeatureImportanceRecord> {
        self.drivers
            .iter()
            .enumerate()
            .map(|(i, d)| FeatureImportanceRecord {
                rank: i + 1,
                feature: d.feature.clone(),
                mean_abs_shap: d.mean_abs_attribution,
            })
            .collect()
    }
}

impl Exporter for DriverRanking {
    fn export_to_string(&self, format: ExportFormat) -> Result<String> {
        let records = self.to_records();
        match format {
            ExportFormat::Csv => to_csv(&records),
            ExportFormat::Json => Ok(serde_json::to_string(&records)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(&records)?),
        }
    }
}

impl Exporter for MetricsExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Csv => to_csv([self]),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ranking() -> DriverRanking {
        let names = vec!["Days_to_Report".to_string(), "TP_Severity_Score".to_string()];
        DriverRanking::from_attributions(&names, &array![[0.25, -0.5], [0.25, 0.5]]).unwrap()
    }

    #[test]
    fn test_feature_importance_csv() {
        let csv = ranking().export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "rank,feature,mean_abs_shap");
        assert_eq!(lines[1], "1,TP_Severity_Score,0.5");
        assert_eq!(lines[2], "2,Days_to_Report,0.25");
    }

    #[test]
    fn test_feature_importance_json() {
        let json = ranking().export_to_string(ExportFormat::Json).unwrap();
        let parsed: Vec<FeatureImportanceRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ranking().to_records());
    }

    #[test]
    fn test_metrics_export_file() {
        let metrics = MetricsExport {
            rmse: 1234.5,
            mape: 0.125,
            n_samples: 40,
            trained_at: Utc::now(),
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("metrics.json");

        metrics.export_to_file(&path, ExportFormat::PrettyJson).unwrap();
        let parsed: MetricsExport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, metrics);
    }

    #[test]
    fn test_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }
}
