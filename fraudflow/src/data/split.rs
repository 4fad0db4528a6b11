//! Seeded train/test splitting.
//!
//! The split is a seeded shuffle with no stratification. Identical inputs
//! and seed reproduce identical row assignments bit for bit.

use crate::errors::SchemaError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// The split feature matrices and label vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitData {
    /// Training feature rows.
    pub x_train: Vec<Vec<f64>>,
    /// Training labels.
    pub y_train: Vec<f64>,
    /// Held-out feature rows.
    pub x_test: Vec<Vec<f64>>,
    /// Held-out labels.
    pub y_test: Vec<f64>,
}

impl SplitData {
    /// Returns the training row count.
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.x_train.len()
    }

    /// Returns the test row count.
    #[must_use]
    pub fn n_test(&self) -> usize {
        self.x_test.len()
    }

    /// Returns the feature count.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.x_train.first().map_or(0, Vec::len)
    }
}

/// Splits rows into train and test partitions.
///
/// The test partition holds `ceil(n * test_fraction)` rows drawn from the
/// head of the seeded shuffle permutation; the remainder trains. Both
/// partitions keep the shuffled order.
pub fn train_test_split(
    features: &[Vec<f64>],
    labels: &[f64],
    test_fraction: f64,
    seed: u64,
) -> Result<SplitData, SchemaError> {
    debug_assert_eq!(features.len(), labels.len());

    let n = features.len();
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(SchemaError::TooFewRows { rows: n });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(SplitData {
        x_train: train_idx.iter().map(|&i| features[i].clone()).collect(),
        y_train: train_idx.iter().map(|&i| labels[i]).collect(),
        x_test: test_idx.iter().map(|&i| features[i].clone()).collect(),
        y_test: test_idx.iter().map(|&i| labels[i]).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let features: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        let labels: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
        (features, labels)
    }

    #[test]
    fn test_test_size_is_ceil() {
        let (features, labels) = rows(95);
        let split = train_test_split(&features, &labels, 0.2, 42).unwrap();

        assert_eq!(split.n_test(), 19);
        assert_eq!(split.n_train(), 76);
    }

    #[test]
    fn test_ceil_rounds_up() {
        let (features, labels) = rows(11);
        let split = train_test_split(&features, &labels, 0.2, 42).unwrap();

        // ceil(11 * 0.2) = 3
        assert_eq!(split.n_test(), 3);
        assert_eq!(split.n_train(), 8);
    }

    #[test]
    fn test_same_seed_reproduces_assignment() {
        let (features, labels) = rows(50);
        let first = train_test_split(&features, &labels, 0.2, 42).unwrap();
        let second = train_test_split(&features, &labels, 0.2, 42).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seed_changes_assignment() {
        let (features, labels) = rows(50);
        let first = train_test_split(&features, &labels, 0.2, 42).unwrap();
        let second = train_test_split(&features, &labels, 0.2, 7).unwrap();

        assert_ne!(first.x_test, second.x_test);
    }

    #[test]
    fn test_partitions_are_disjoint_and_exhaustive() {
        let (features, labels) = rows(30);
        let split = train_test_split(&features, &labels, 0.25, 42).unwrap();

        let mut seen: Vec<f64> = split
            .x_train
            .iter()
            .chain(&split.x_test)
            .map(|row| row[0])
            .collect();
        seen.sort_by(f64::total_cmp);

        let expected: Vec<f64> = (0..30).map(|i| f64::from(i)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_too_few_rows_rejected() {
        let (features, labels) = rows(1);
        let err = train_test_split(&features, &labels, 0.2, 42).unwrap_err();
        assert!(matches!(err, SchemaError::TooFewRows { rows: 1 }));

        let err = train_test_split(&[], &[], 0.2, 42).unwrap_err();
        assert!(matches!(err, SchemaError::TooFewRows { rows: 0 }));
    }
}
