//! Prohibited-attribute screening of the model's feature set.
//!
//! The check is literal column-name membership against a configurable list.
//! It does not look for proxies (correlated stand-ins for a prohibited
//! attribute).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reporting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Attributes that must not be model inputs.
    pub prohibited_attributes: Vec<String>,

    /// Number of cost drivers listed in the report (default: 5)
    pub top_drivers: usize,

    /// Summary plot width in pixels (default: 1000)
    pub figure_width: u32,

    /// Summary plot height in pixels (default: 800)
    pub figure_height: u32,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            prohibited_attributes: ["Race", "Religion", "Ethnicity", "Political_Affiliation"]
                .into_iter()
                .map(String::from)
                .collect(),
            top_drivers: 5,
            figure_width: 1000,
            figure_height: 800,
        }
    }
}

/// Outcome of the prohibited-attribute check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "found", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceVerdict {
    /// No prohibited attribute is a model input.
    Pass,
    /// These prohibited attributes are model inputs, in configured order.
    Warning(Vec<String>),
}

impl ComplianceVerdict {
    /// Whether the check passed.
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Prohibited attributes found among the features.
    pub fn found(&self) -> &[String] {
        match self {
            Self::Pass => &[],
            Self::Warning(found) => found,
        }
    }
}

impl fmt::Display for ComplianceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Warning(found) => write!(f, "WARNING ({})", found.join(", ")),
        }
    }
}

/// Check `features` (model input column names) against the prohibited list.
pub fn check_compliance<S: AsRef<str>>(features: &[S], config: &ComplianceConfig) -> ComplianceVerdict {
    let found: Vec<String> = config
        .prohibited_attributes
        .iter()
        .filter(|p| features.iter().any(|f| f.as_ref() == p.as_str()))
        .cloned()
        .collect();

    if found.is_empty() {
        ComplianceVerdict::Pass
    } else {
        ComplianceVerdict::Warning(found)
    }
}
