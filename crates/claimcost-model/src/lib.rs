#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/claimcost/claimcost/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod explain;
pub mod features;
pub mod gbdt;
pub mod metrics;
pub mod pipeline;
pub mod preprocess;
pub mod split;
pub mod training;

pub use error::{ModelError, Result};
pub use explain::TreeExplainer;
pub use features::{FeatureColumn, FeatureKind, FeatureTable, FeatureValues};
pub use gbdt::{GbdtConfig, GbdtTrainer, GradientBoostedTrees, RegressionTree, TreeNode};
pub use metrics::RegressionMetrics;
pub use pipeline::{FORMAT_VERSION, FittedPipeline};
pub use preprocess::{OneHotEncoder, Preprocessor, StandardScaler};
pub use split::{TrainTestSplit, train_test_split};
pub use training::{ModelTrainer, TrainerConfig, TrainingOutcome};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
