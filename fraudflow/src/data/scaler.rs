//! Feature standardization.
//!
//! The scaler is fitted once on the training split and applied to both
//! splits and to every inference request. It is persisted as a versioned
//! artifact and never recomputed at inference time.

use crate::errors::SchemaError;
use serde::{Deserialize, Serialize};

/// Per-feature standardizer: subtract the mean, divide by the std.
///
/// The std is the biased estimate (normalized by `n`). Zero-variance
/// features divide by 1.0 so constant columns pass through centered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fits the scaler on a rectangular matrix.
    ///
    /// # Panics
    ///
    /// Panics when rows disagree in width.
    #[must_use]
    pub fn fit(matrix: &[Vec<f64>]) -> Self {
        let n_rows = matrix.len();
        let n_cols = matrix.first().map_or(0, Vec::len);

        let mut means = vec![0.0; n_cols];
        for row in matrix {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n_rows.max(1) as f64;
        }

        let mut stds = vec![0.0; n_cols];
        for row in matrix {
            for (col, value) in row.iter().enumerate() {
                let delta = value - means[col];
                stds[col] += delta * delta;
            }
        }
        for std in &mut stds {
            *std = (*std / n_rows.max(1) as f64).sqrt();
            if *std == 0.0 {
                *std = 1.0;
            }
        }

        Self { means, stds }
    }

    /// Standardizes one feature row.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, SchemaError> {
        if row.len() != self.means.len() {
            return Err(SchemaError::WrongArity {
                expected: self.means.len(),
                found: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(value, (mean, std))| (value - mean) / std)
            .collect())
    }

    /// Standardizes a whole matrix.
    pub fn transform_matrix(&self, matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, SchemaError> {
        matrix.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Returns the number of features the scaler was fitted on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// Returns the fitted means.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Returns the fitted stds after the zero-variance guard.
    #[must_use]
    pub fn stds(&self) -> &[f64] {
        &self.stds
    }
}
