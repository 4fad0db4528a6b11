//! Evaluation metrics for binary fraud classifiers.
//!
//! The negative class ("Not Fraud") always comes first in matrices and
//! reports. ROC-AUC uses tie-averaged ranks and is undefined when the test
//! split contains a single class, in which case it is `None` rather than a
//! fabricated number.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Fraction of predictions that match the true labels.
#[must_use]
pub fn accuracy(truth: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(truth.len(), predicted.len());
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| (**t > 0.5) == (**p > 0.5))
        .count();
    hits as f64 / truth.len() as f64
}

/// A 2x2 confusion matrix. Rows are true classes, columns predicted classes,
/// negative class first in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Legitimate transactions predicted legitimate.
    pub true_negatives: u64,
    /// Legitimate transactions predicted fraudulent.
    pub false_positives: u64,
    /// Fraudulent transactions predicted legitimate.
    pub false_negatives: u64,
    /// Fraudulent transactions predicted fraudulent.
    pub true_positives: u64,
}

impl ConfusionMatrix {
    /// Counts outcomes from paired true and predicted labels.
    #[must_use]
    pub fn from_predictions(truth: &[f64], predicted: &[f64]) -> Self {
        debug_assert_eq!(truth.len(), predicted.len());
        let mut matrix = Self {
            true_negatives: 0,
            false_positives: 0,
            false_negatives: 0,
            true_positives: 0,
        };
        for (t, p) in truth.iter().zip(predicted) {
            match (*t > 0.5, *p > 0.5) {
                (false, false) => matrix.true_negatives += 1,
                (false, true) => matrix.false_positives += 1,
                (true, false) => matrix.false_negatives += 1,
                (true, true) => matrix.true_positives += 1,
            }
        }
        matrix
    }

    /// Total number of scored samples.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }

    /// Number of true negative-class samples.
    #[must_use]
    pub fn support_negative(&self) -> u64 {
        self.true_negatives + self.false_positives
    }

    /// Number of true positive-class samples.
    #[must_use]
    pub fn support_positive(&self) -> u64 {
        self.false_negatives + self.true_positives
    }

    /// Renders the matrix as a small labelled CSV document.
    #[must_use]
    pub fn to_csv(&self) -> String {
        format!(
            ",predicted_not_fraud,predicted_fraud\n\
             actual_not_fraud,{},{}\n\
             actual_fraud,{},{}\n",
            self.true_negatives, self.false_positives, self.false_negatives, self.true_positives
        )
    }
}

/// Area under the ROC curve from scores, computed with tie-averaged ranks.
///
/// Returns `None` when the labels contain a single class.
#[must_use]
pub fn roc_auc(truth: &[f64], scores: &[f64]) -> Option<f64> {
    debug_assert_eq!(truth.len(), scores.len());
    let n_pos = truth.iter().filter(|&&t| t > 0.5).count();
    let n_neg = truth.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks; tied scores share the mean rank of their group.
    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let mean_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = mean_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = truth
        .iter()
        .zip(&ranks)
        .filter(|(t, _)| **t > 0.5)
        .map(|(_, r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Precision, recall, f1 and support for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class display name.
    pub label: String,
    /// Correct positive calls over all positive calls.
    pub precision: f64,
    /// Correct positive calls over all true positives.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// True sample count for the class.
    pub support: u64,
}

/// Per-class metrics plus the usual averages, rendered in the familiar
/// text-report layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Metrics for each class, negative class first.
    pub classes: Vec<ClassMetrics>,
    /// Overall accuracy.
    pub accuracy: f64,
}

impl ClassificationReport {
    /// Builds the report from a confusion matrix.
    #[must_use]
    pub fn from_confusion(matrix: &ConfusionMatrix) -> Self {
        let tn = matrix.true_negatives as f64;
        let fp = matrix.false_positives as f64;
        let fn_ = matrix.false_negatives as f64;
        let tp = matrix.true_positives as f64;

        let negative = ClassMetrics {
            label: "Not Fraud".to_string(),
            precision: safe_div(tn, tn + fn_),
            recall: safe_div(tn, tn + fp),
            f1: f1_score(safe_div(tn, tn + fn_), safe_div(tn, tn + fp)),
            support: matrix.support_negative(),
        };
        let positive = ClassMetrics {
            label: "Fraud".to_string(),
            precision: safe_div(tp, tp + fp),
            recall: safe_div(tp, tp + fn_),
            f1: f1_score(safe_div(tp, tp + fp), safe_div(tp, tp + fn_)),
            support: matrix.support_positive(),
        };

        let total = matrix.total() as f64;
        let accuracy = safe_div(tn + tp, total);

        Self {
            classes: vec![negative, positive],
            accuracy,
        }
    }

    /// Total support across the classes.
    #[must_use]
    pub fn total_support(&self) -> u64 {
        self.classes.iter().map(|c| c.support).sum()
    }

    /// Renders the report as aligned text.
    #[must_use]
    pub fn render(&self) -> String {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .max()
            .unwrap_or(0)
            .max("weighted avg".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        );
        out.push('\n');

        for class in &self.classes {
            let _ = writeln!(
                out,
                "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class.label, class.precision, class.recall, class.f1, class.support
            );
        }
        out.push('\n');

        let total = self.total_support();
        let _ = writeln!(
            out,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, total
        );

        let n = self.classes.len() as f64;
        let macro_p = self.classes.iter().map(|c| c.precision).sum::<f64>() / n;
        let macro_r = self.classes.iter().map(|c| c.recall).sum::<f64>() / n;
        let macro_f = self.classes.iter().map(|c| c.f1).sum::<f64>() / n;
        let _ = writeln!(
            out,
            "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
            "macro avg", macro_p, macro_r, macro_f, total
        );

        let total_f = total as f64;
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            self.classes
                .iter()
                .map(|c| f(c) * c.support as f64)
                .sum::<f64>()
                / total_f.max(1.0)
        };
        let _ = writeln!(
            out,
            "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
            "weighted avg",
            weighted(|c| c.precision),
            weighted(|c| c.recall),
            weighted(|c| c.f1),
            total
        );

        out
    }
}

fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}
