#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/claimcost/claimcost/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod abt;
pub mod builder;
pub mod dates;
pub mod error;
pub mod raw;
pub mod schema;
pub mod severity;

pub use abt::Abt;
pub use builder::{AgeImputation, BuildSummary, DatasetBuilder, DatasetConfig};
pub use error::{DataError, Result};
pub use raw::{RawPaths, RawTables};
pub use severity::SeverityScale;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
