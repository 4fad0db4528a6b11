//! Hyperparameter grid search with k-fold cross-validation.
//!
//! The grid is fixed: regularization strength crossed with solver variant,
//! penalty always L2. Candidate x fold fits run in parallel on a dedicated
//! worker pool; fold scores are aggregated by candidate index so the result
//! does not depend on completion order. Ties on mean accuracy keep the
//! first candidate in grid order.

use crate::errors::TuningError;
use crate::model::{accuracy, BinaryEstimator, FitConfig, HyperParams, LogisticModel, Solver};
use crate::store::{layout, mirror_artifact, ArtifactStore, RemoteStore};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Regularization strengths of the search grid.
pub const GRID_C: [f64; 4] = [0.01, 0.1, 1.0, 10.0];

/// Solver variants of the search grid.
pub const GRID_SOLVERS: [Solver; 2] = [Solver::Lbfgs, Solver::Liblinear];

/// Cross-validation fold count.
pub const CV_FOLDS: usize = 3;

/// Exhaustive grid search over the fixed hyperparameter grid.
pub struct Tuner {
    store: Arc<ArtifactStore>,
    remote: Option<Arc<dyn RemoteStore>>,
}

impl Tuner {
    /// Creates a tuner writing to the given store, mirroring to the remote
    /// when one is configured.
    #[must_use]
    pub fn new(store: Arc<ArtifactStore>, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self { store, remote }
    }

    /// Searches the grid, refits the winner on the full training split, and
    /// persists it as the best model.
    pub async fn tune(
        &self,
        x_train: &[Vec<f64>],
        y_train: &[f64],
    ) -> Result<LogisticModel, TuningError> {
        let started = Instant::now();
        let n = x_train.len();
        if n < CV_FOLDS {
            return Err(TuningError::TooFewRows {
                rows: n,
                folds: CV_FOLDS,
            });
        }

        let grid = candidates();
        let folds = contiguous_folds(n, CV_FOLDS);
        let jobs: Vec<(usize, usize)> = (0..grid.len())
            .flat_map(|ci| (0..folds.len()).map(move |fi| (ci, fi)))
            .collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_cpus::get())
            .build()
            .map_err(|e| TuningError::Pool {
                reason: e.to_string(),
            })?;

        // Indexed collect keeps job order, so aggregation is deterministic
        // regardless of which worker finishes first.
        let fold_scores: Vec<(usize, f64)> = pool.install(|| {
            jobs.par_iter()
                .map(|&(ci, fi)| {
                    score_fold(x_train, y_train, folds[fi], grid[ci]).map(|acc| (ci, acc))
                })
                .collect::<Result<Vec<_>, TuningError>>()
        })?;

        let mut sums = vec![0.0; grid.len()];
        for (ci, acc) in fold_scores {
            sums[ci] += acc;
        }
        let means: Vec<f64> = sums.into_iter().map(|s| s / CV_FOLDS as f64).collect();

        for (params, mean) in grid.iter().zip(&means) {
            debug!(
                c = params.c,
                solver = %params.solver,
                mean_accuracy = *mean,
                "scored candidate"
            );
        }

        let (best_index, best_score) =
            means
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(bi, bs), (i, &s)| {
                    if s > bs {
                        (i, s)
                    } else {
                        (bi, bs)
                    }
                });
        let winner = grid[best_index];

        let model = LogisticModel::fit(x_train, y_train, winner, FitConfig::default()).map_err(
            |source| TuningError::Candidate {
                c: winner.c,
                solver: winner.solver.to_string(),
                source,
            },
        )?;
        if !model.converged {
            warn!(
                c = winner.c,
                solver = %winner.solver,
                iterations = model.n_iter,
                "winning model stopped before reaching tolerance"
            );
        }

        self.store.put_json(layout::BEST_MODEL, &model)?;
        if let Some(remote) = &self.remote {
            let bytes = self.store.get_bytes(layout::BEST_MODEL)?;
            mirror_artifact(remote.as_ref(), layout::BEST_MODEL, &bytes).await;
        }

        info!(
            c = winner.c,
            solver = %winner.solver,
            cv_accuracy = best_score,
            candidates = grid.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "grid search complete"
        );
        Ok(model)
    }
}

/// The full grid in search order: strength outer, solver inner.
fn candidates() -> Vec<HyperParams> {
    let mut grid = Vec::with_capacity(GRID_C.len() * GRID_SOLVERS.len());
    for &c in &GRID_C {
        for &solver in &GRID_SOLVERS {
            grid.push(HyperParams { c, solver });
        }
    }
    grid
}

/// Splits `0..n` into `k` contiguous half-open ranges. The first `n % k`
/// folds take one extra row.
fn contiguous_folds(n: usize, k: usize) -> Vec<(usize, usize)> {
    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let len = base + usize::from(i < extra);
        folds.push((start, start + len));
        start += len;
    }
    folds
}

/// Fits one candidate on everything outside the fold and scores accuracy on
/// the fold itself.
fn score_fold(
    x: &[Vec<f64>],
    y: &[f64],
    fold: (usize, usize),
    params: HyperParams,
) -> Result<f64, TuningError> {
    let (start, end) = fold;
    let mut train_x = Vec::with_capacity(x.len() - (end - start));
    let mut train_y = Vec::with_capacity(x.len() - (end - start));
    for i in (0..x.len()).filter(|i| *i < start || *i >= end) {
        train_x.push(x[i].clone());
        train_y.push(y[i]);
    }

    let model = LogisticModel::fit(&train_x, &train_y, params, FitConfig::default()).map_err(
        |source| TuningError::Candidate {
            c: params.c,
            solver: params.solver.to_string(),
            source,
        },
    )?;

    let predictions: Vec<f64> = x[start..end].iter().map(|row| model.predict(row)).collect();
    Ok(accuracy(&y[start..end], &predictions))
}
