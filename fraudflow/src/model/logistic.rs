//! L2-regularized logistic regression.
//!
//! Minimizes `0.5 * ||w||^2 + C * sum(log(1 + exp(-y * (w.x + b))))` over
//! labels mapped to {-1, +1}. The intercept carries no penalty. Two solver
//! variants mirror the tuning grid: a batch gradient solver with a
//! backtracking line search, and a seeded stochastic solver. Both are
//! deterministic given the same data and seed.
//!
//! Non-convergence within the iteration budget is not an error: the
//! best-effort model is returned with `converged == false` so callers can
//! log and audit it.

use crate::errors::TrainingError;
use crate::model::BinaryEstimator;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed iteration budget for every fit.
pub const MAX_ITER: usize = 1000;

/// Convergence tolerance on the gradient infinity norm (batch solver) and
/// the per-epoch weight delta (stochastic solver).
pub const TOLERANCE: f64 = 1e-4;

/// Optimizer variants of the tuning grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Solver {
    /// Batch gradient solver with a backtracking line search.
    Lbfgs,
    /// Seeded stochastic gradient solver.
    Liblinear,
}

impl Solver {
    /// Returns the solver's grid name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lbfgs => "lbfgs",
            Self::Liblinear => "liblinear",
        }
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hyperparameters of one candidate. The penalty is always L2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    /// Inverse regularization strength; smaller means stronger penalty.
    pub c: f64,
    /// Optimizer variant.
    pub solver: Solver,
}

impl Default for HyperParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            solver: Solver::Lbfgs,
        }
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C={}, solver={}", self.c, self.solver)
    }
}

/// Fitting configuration shared by the trainer and tuner.
#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    /// Iteration budget (batch iterations or stochastic epochs).
    pub max_iter: usize,
    /// Seed for the stochastic solver's shuffles.
    pub seed: u64,
    /// Convergence tolerance.
    pub tol: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iter: MAX_ITER,
            seed: 42,
            tol: TOLERANCE,
        }
    }
}

/// A fitted logistic regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// Per-feature coefficients.
    pub weights: Vec<f64>,
    /// Unpenalized intercept.
    pub intercept: f64,
    /// The hyperparameters the model was fitted with.
    pub hyper: HyperParams,
    /// Whether the solver met the tolerance within the budget.
    pub converged: bool,
    /// Iterations actually used.
    pub n_iter: usize,
}

impl LogisticModel {
    /// Fits a model on scaled features and {0, 1} labels.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        hyper: HyperParams,
        fit: FitConfig,
    ) -> Result<Self, TrainingError> {
        if x.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(TrainingError::DimensionMismatch {
                rows: x.len(),
                labels: y.len(),
            });
        }

        // Map labels to {-1, +1} for the margin formulation.
        let signs: Vec<f64> = y.iter().map(|&v| if v > 0.5 { 1.0 } else { -1.0 }).collect();

        match hyper.solver {
            Solver::Lbfgs => fit_batch(x, &signs, hyper, fit),
            Solver::Liblinear => fit_stochastic(x, &signs, hyper, fit),
        }
    }

    /// Raw decision value `w.x + b`.
    #[must_use]
    pub fn decision(&self, features: &[f64]) -> f64 {
        debug_assert_eq!(features.len(), self.weights.len());
        self.weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept
    }
}

impl BinaryEstimator for LogisticModel {
    fn predict(&self, features: &[f64]) -> f64 {
        if self.decision(features) > 0.0 {
            1.0
        } else {
            0.0
        }
    }

    fn predict_proba(&self, features: &[f64]) -> Option<f64> {
        Some(sigmoid(self.decision(features)))
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}

/// Numerically stable sigmoid.
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Stable `log(1 + exp(v))`.
fn log1p_exp(v: f64) -> f64 {
    if v > 30.0 {
        v
    } else if v < -30.0 {
        0.0
    } else {
        v.exp().ln_1p()
    }
}

fn objective(x: &[Vec<f64>], signs: &[f64], w: &[f64], b: f64, c: f64) -> f64 {
    let penalty = 0.5 * w.iter().map(|v| v * v).sum::<f64>();
    let loss: f64 = x
        .iter()
        .zip(signs)
        .map(|(row, &sign)| {
            let z = dot(w, row) + b;
            log1p_exp(-sign * z)
        })
        .sum();
    penalty + c * loss
}

fn gradient(x: &[Vec<f64>], signs: &[f64], w: &[f64], b: f64, c: f64) -> (Vec<f64>, f64) {
    let mut grad_w = w.to_vec();
    let mut grad_b = 0.0;

    for (row, &sign) in x.iter().zip(signs) {
        let z = dot(w, row) + b;
        // d/dz log(1 + exp(-s z)) = -s * sigmoid(-s z)
        let factor = -sign * sigmoid(-sign * z) * c;
        for (g, value) in grad_w.iter_mut().zip(row) {
            *g += factor * value;
        }
        grad_b += factor;
    }

    (grad_w, grad_b)
}

fn dot(w: &[f64], x: &[f64]) -> f64 {
    w.iter().zip(x).map(|(a, b)| a * b).sum()
}

fn fit_batch(
    x: &[Vec<f64>],
    signs: &[f64],
    hyper: HyperParams,
    fit: FitConfig,
) -> Result<LogisticModel, TrainingError> {
    let n_features = x[0].len();
    let mut w = vec![0.0; n_features];
    let mut b = 0.0;
    let mut current = objective(x, signs, &w, b, hyper.c);
    let mut step = 1.0;
    let mut converged = false;
    let mut n_iter = 0;

    for iter in 0..fit.max_iter {
        n_iter = iter + 1;
        let (grad_w, grad_b) = gradient(x, signs, &w, b, hyper.c);

        let grad_norm = grad_w
            .iter()
            .chain(std::iter::once(&grad_b))
            .fold(0.0_f64, |acc, g| acc.max(g.abs()));
        if !grad_norm.is_finite() {
            return Err(TrainingError::NonFinite { iteration: iter });
        }
        if grad_norm <= fit.tol {
            converged = true;
            n_iter = iter;
            break;
        }

        let grad_sq = grad_w.iter().map(|g| g * g).sum::<f64>() + grad_b * grad_b;

        // Backtracking line search with a sufficient-decrease condition.
        let mut accepted = false;
        for _ in 0..50 {
            let cand_w: Vec<f64> =
                w.iter().zip(&grad_w).map(|(v, g)| v - step * g).collect();
            let cand_b = b - step * grad_b;
            let cand = objective(x, signs, &cand_w, cand_b, hyper.c);

            if cand.is_finite() && cand <= current - 1e-4 * step * grad_sq {
                w = cand_w;
                b = cand_b;
                current = cand;
                step *= 1.25;
                accepted = true;
                break;
            }
            step *= 0.5;
        }

        if !accepted {
            // Step size underflowed; no further progress is possible.
            break;
        }
    }

    Ok(LogisticModel {
        weights: w,
        intercept: b,
        hyper,
        converged,
        n_iter,
    })
}

fn fit_stochastic(
    x: &[Vec<f64>],
    signs: &[f64],
    hyper: HyperParams,
    fit: FitConfig,
) -> Result<LogisticModel, TrainingError> {
    let n = x.len();
    let n_features = x[0].len();
    let mut w = vec![0.0; n_features];
    let mut b = 0.0;

    // Scale the penalty so per-sample gradients optimize the same objective.
    let lambda = 1.0 / (hyper.c * n as f64);
    let mut rng = StdRng::seed_from_u64(fit.seed);
    let mut order: Vec<usize> = (0..n).collect();

    let mut converged = false;
    let mut n_iter = 0;
    let mut t: u64 = 0;

    for epoch in 0..fit.max_iter {
        n_iter = epoch + 1;
        order.shuffle(&mut rng);
        let before = w.clone();
        let before_b = b;

        for &i in &order {
            t += 1;
            let eta = 0.5 / (1.0 + lambda * t as f64).sqrt();
            let z = dot(&w, &x[i]) + b;
            let factor = -signs[i] * sigmoid(-signs[i] * z);

            for (value, feature) in w.iter_mut().zip(&x[i]) {
                *value -= eta * (lambda * *value + factor * feature);
            }
            b -= eta * factor;
        }

        if w.iter().any(|v| !v.is_finite()) || !b.is_finite() {
            return Err(TrainingError::NonFinite { iteration: epoch });
        }

        let delta = w
            .iter()
            .zip(&before)
            .map(|(new, old)| (new - old).abs())
            .fold((b - before_b).abs(), f64::max);
        if delta <= fit.tol {
            converged = true;
            break;
        }
    }

    Ok(LogisticModel {
        weights: w,
        intercept: b,
        hyper,
        converged,
        n_iter,
    })
}
