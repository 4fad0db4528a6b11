//! Model fitting, tuning, and evaluation.
//!
//! The [`BinaryEstimator`] trait is the seam between the pipeline and the
//! model family; [`LogisticModel`] is the only family the fixed grid
//! searches today.

mod estimator;
mod evaluate;
mod logistic;
mod metrics;
mod trainer;
mod tuner;

pub use estimator::{BinaryEstimator, MajorityClassifier};
pub use evaluate::{EvaluationResult, Evaluator};
pub use logistic::{sigmoid, FitConfig, HyperParams, LogisticModel, Solver, MAX_ITER, TOLERANCE};
pub use metrics::{accuracy, roc_auc, ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use trainer::ModelTrainer;
pub use tuner::{Tuner, CV_FOLDS, GRID_C, GRID_SOLVERS};
