#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/claimcost/claimcost/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod attribution;
pub mod compliance;
pub mod error;
pub mod export;
pub mod report;
pub mod summary;

pub use attribution::{DriverRanking, FeatureAttribution};
pub use compliance::{ComplianceConfig, ComplianceVerdict, check_compliance};
pub use error::{OutputError, Result};
pub use export::{ExportFormat, Exporter, FeatureImportanceRecord, MetricsExport};
pub use report::{ComplianceReport, DEFAULT_FIGURE_PATH, ReportBuilder};
pub use summary::SummaryPlot;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
