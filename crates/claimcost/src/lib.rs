#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/claimcost/claimcost/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pipeline;

// Re-export main types from sub-crates
pub use claimcost_data as data;
pub use claimcost_model as model;
pub use claimcost_output as output;

pub use config::{PipelineConfig, PipelinePaths};
pub use error::{PipelineError, Result};
pub use pipeline::{ClaimCostPipeline, ExplainabilityReport, RunOutcome};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
