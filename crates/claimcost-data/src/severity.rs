//! Third-party injury severity scale.
//!
//! Maps the free-text `TP_Injury_Severity` label onto an ordinal score. The
//! scale is configuration: callers can replace or extend the lookup without
//! touching the builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordinal lookup from severity label to numeric score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityScale {
    /// Score per label (exact, case-sensitive match).
    pub scores: BTreeMap<String, f64>,

    /// Score for labels absent from `scores` and for missing values.
    pub fallback: f64,
}

impl Default for SeverityScale {
    fn default() -> Self {
        let scores = [("None", 0.0), ("Minor", 1.0), ("Serious", 5.0), ("Fatal", 10.0)]
            .into_iter()
            .map(|(label, score)| (label.to_string(), score))
            .collect();

        Self {
            scores,
            fallback: 0.0,
        }
    }
}

impl SeverityScale {
    /// Build a scale from explicit label/score pairs.
    pub fn new<I, S>(scores: I, fallback: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            scores: scores.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            fallback,
        }
    }

    /// Score a label, falling back for unknown or missing values.
    pub fn score(&self, label: Option<&str>) -> f64 {
        label
            .and_then(|l| self.scores.get(l))
            .copied()
            .unwrap_or(self.fallback)
    }

    /// Whether the label is part of the scale.
    pub fn contains(&self, label: &str) -> bool {
        self.scores.contains_key(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("Minor"), 1.0)]
    #[case(Some("Serious"), 5.0)]
    #[case(Some("Fatal"), 10.0)]
    #[case(Some("None"), 0.0)]
    #[case(Some("Catastrophic"), 0.0)]
    #[case(Some("minor"), 0.0)]
    #[case(None, 0.0)]
    fn test_default_scale(#[case] label: Option<&str>, #[case] expected: f64) {
        assert_eq!(SeverityScale::default().score(label), expected);
    }

    #[test]
    fn test_custom_scale() {
        let scale = SeverityScale::new([("Low", 2.0), ("High", 7.5)], -1.0);
        assert_eq!(scale.score(Some("High")), 7.5);
        assert_eq!(scale.score(Some("Minor")), -1.0);
        assert!(scale.contains("Low"));
        assert!(!scale.contains("Fatal"));
    }

    #[test]
    fn test_partial_json_keeps_fallback_default() {
        let scale: SeverityScale =
            serde_json::from_str(r#"{"scores": {"Moderate": 3.0}}"#).unwrap();
        assert_eq!(scale.score(Some("Moderate")), 3.0);
        assert_eq!(scale.fallback, 0.0);
    }
}
