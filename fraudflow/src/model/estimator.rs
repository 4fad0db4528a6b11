//! Estimator interface.
//!
//! The trait is the seam between the pipeline and any model family: the
//! evaluator, tuner, and serving layer all consume it. "Has no probability
//! estimate" is an honest, testable case; consumers must never fabricate a
//! score when [`BinaryEstimator::predict_proba`] returns `None`.

/// A fitted binary classifier over scaled feature rows.
pub trait BinaryEstimator: Send + Sync {
    /// Predicts the label for one feature row: `1.0` for fraud, `0.0`
    /// otherwise. The row must match the width the model was trained on.
    fn predict(&self, features: &[f64]) -> f64;

    /// Probability of the fraud class in `[0, 1]`, when the model exposes
    /// one.
    fn predict_proba(&self, features: &[f64]) -> Option<f64>;

    /// Short name of the model family.
    fn name(&self) -> &str;
}

/// Baseline that always predicts the majority class of its training labels.
///
/// Exposes no probability estimate, so evaluations of this model carry no
/// ROC-AUC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MajorityClassifier {
    majority: f64,
}

impl MajorityClassifier {
    /// Fits the baseline. Ties resolve to the negative class.
    #[must_use]
    pub fn fit(labels: &[f64]) -> Self {
        let positives = labels.iter().filter(|&&y| y > 0.5).count();
        let majority = if positives * 2 > labels.len() { 1.0 } else { 0.0 };
        Self { majority }
    }
}

impl BinaryEstimator for MajorityClassifier {
    fn predict(&self, _features: &[f64]) -> f64 {
        self.majority
    }

    fn predict_proba(&self, _features: &[f64]) -> Option<f64> {
        None
    }

    fn name(&self) -> &str {
        "majority_class"
    }
}
