//! Seeded train/test split.

use crate::error::{ModelError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Row indices assigned to each side of the split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    /// Training rows.
    pub train: Vec<usize>,
    /// Held-out rows.
    pub test: Vec<usize>,
}

/// Shuffle `0..n_rows` with `seed` and hold out `ceil(test_fraction * n_rows)`.
///
/// The same `n_rows`, fraction and seed always give the same assignment.
pub fn train_test_split(n_rows: usize, test_fraction: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ModelError::InvalidParameter(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let n_test = (test_fraction * n_rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(ModelError::InsufficientData {
            required: 2,
            actual: n_rows,
        });
    }

    let mut rows: Vec<usize> = (0..n_rows).collect();
    rows.shuffle(&mut StdRng::seed_from_u64(seed));

    let train = rows.split_off(n_test);
    Ok(TrainTestSplit { train, test: rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, 2)]
    #[case(11, 3)]
    #[case(2, 1)]
    fn test_split_sizes(#[case] n_rows: usize, #[case] n_test: usize) {
        let split = train_test_split(n_rows, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), n_test);
        assert_eq!(split.train.len(), n_rows - n_test);
    }

    #[test]
    fn test_split_is_a_partition() {
        let split = train_test_split(50, 0.2, 42).unwrap();
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_reproducible() {
        assert_eq!(
            train_test_split(100, 0.2, 42).unwrap(),
            train_test_split(100, 0.2, 42).unwrap()
        );
        assert_ne!(
            train_test_split(100, 0.2, 42).unwrap(),
            train_test_split(100, 0.2, 7).unwrap()
        );
    }

    #[test]
    fn test_split_needs_two_rows() {
        assert!(matches!(
            train_test_split(1, 0.2, 42).unwrap_err(),
            ModelError::InsufficientData { actual: 1, .. }
        ));
        assert!(train_test_split(0, 0.2, 42).is_err());
        assert!(train_test_split(10, 1.0, 42).is_err());
    }
}
