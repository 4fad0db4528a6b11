//! Held-out evaluation and report artifacts.

use crate::errors::EvaluationError;
use crate::model::{
    accuracy, roc_auc, BinaryEstimator, ClassificationReport, ConfusionMatrix,
};
use crate::store::{layout, mirror_artifact, ArtifactStore, RemoteStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// The metrics of one evaluation pass over the held-out split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Name of the evaluated estimator.
    pub model_name: String,
    /// Fraction of correct predictions.
    pub accuracy: f64,
    /// Area under the ROC curve. Absent when the model exposes no
    /// probability estimate or the test split has a single class.
    pub roc_auc: Option<f64>,
    /// The 2x2 outcome counts.
    pub confusion: ConfusionMatrix,
    /// Per-class precision, recall, f1 and support.
    pub report: ClassificationReport,
    /// Held-out row count.
    pub n_test: usize,
    /// When the evaluation ran.
    pub evaluated_at: DateTime<Utc>,
}

/// Scores a fitted model on the held-out split and persists the report
/// artifacts.
pub struct Evaluator {
    store: Arc<ArtifactStore>,
    remote: Option<Arc<dyn RemoteStore>>,
}

impl Evaluator {
    /// Creates an evaluator writing to the given store, mirroring the text
    /// reports to the remote when one is configured.
    #[must_use]
    pub fn new(store: Arc<ArtifactStore>, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self { store, remote }
    }

    /// Computes accuracy, the confusion matrix, conditionally ROC-AUC, and
    /// the per-class report; persists all three report artifacts.
    pub async fn evaluate(
        &self,
        model: &dyn BinaryEstimator,
        x_test: &[Vec<f64>],
        y_test: &[f64],
    ) -> Result<EvaluationResult, EvaluationError> {
        if x_test.is_empty() {
            return Err(EvaluationError::EmptyTestSet);
        }
        if x_test.len() != y_test.len() {
            return Err(EvaluationError::DimensionMismatch {
                rows: x_test.len(),
                labels: y_test.len(),
            });
        }

        let predictions: Vec<f64> = x_test.iter().map(|row| model.predict(row)).collect();
        let acc = accuracy(y_test, &predictions);
        let confusion = ConfusionMatrix::from_predictions(y_test, &predictions);

        // AUC needs ranked probabilities; a model without them gets none.
        let scores: Option<Vec<f64>> =
            x_test.iter().map(|row| model.predict_proba(row)).collect();
        let auc = scores.as_deref().and_then(|s| roc_auc(y_test, s));

        let report = ClassificationReport::from_confusion(&confusion);
        let result = EvaluationResult {
            model_name: model.name().to_string(),
            accuracy: acc,
            roc_auc: auc,
            confusion,
            report: report.clone(),
            n_test: x_test.len(),
            evaluated_at: Utc::now(),
        };

        self.store.put_json(layout::EVALUATION_RESULTS, &result)?;
        self.store
            .put_text(layout::CLASSIFICATION_REPORT, &report.render())?;
        self.store
            .put_text(layout::CONFUSION_MATRIX, &confusion.to_csv())?;

        if let Some(remote) = &self.remote {
            for name in [layout::CLASSIFICATION_REPORT, layout::CONFUSION_MATRIX] {
                let bytes = self.store.get_bytes(name)?;
                mirror_artifact(remote.as_ref(), name, &bytes).await;
            }
        }

        info!(
            model = %result.model_name,
            accuracy = acc,
            roc_auc = ?result.roc_auc,
            test_rows = result.n_test,
            "evaluation complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FitConfig, HyperParams, LogisticModel, MajorityClassifier};
    use tempfile::TempDir;

    fn fitted_model() -> (LogisticModel, Vec<Vec<f64>>, Vec<f64>) {
        let x_train = vec![
            vec![-2.0],
            vec![-1.5],
            vec![-1.0],
            vec![1.0],
            vec![1.5],
            vec![2.0],
        ];
        let y_train = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let model =
            LogisticModel::fit(&x_train, &y_train, HyperParams::default(), FitConfig::default())
                .unwrap();

        let x_test = vec![vec![-1.8], vec![-0.9], vec![0.9], vec![1.8]];
        let y_test = vec![0.0, 0.0, 1.0, 1.0];
        (model, x_test, y_test)
    }

    #[tokio::test]
    async fn test_evaluate_persists_all_reports() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ArtifactStore::open(dir.path()).unwrap());
        let evaluator = Evaluator::new(Arc::clone(&store), None);

        let (model, x_test, y_test) = fitted_model();
        let result = evaluator.evaluate(&model, &x_test, &y_test).await.unwrap();

        assert!((result.accuracy - 1.0).abs() < 1e-12);
        assert_eq!(result.roc_auc, Some(1.0));
        assert_eq!(result.confusion.total(), 4);

        let persisted: EvaluationResult = store.get_json(layout::EVALUATION_RESULTS).unwrap();
        assert_eq!(persisted, result);
        assert!(store.exists(layout::CLASSIFICATION_REPORT));
        assert!(store.exists(layout::CONFUSION_MATRIX));
    }

    #[tokio::test]
    async fn test_auc_absent_without_probabilities() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ArtifactStore::open(dir.path()).unwrap());
        let evaluator = Evaluator::new(store, None);

        let y_test = vec![0.0, 0.0, 0.0, 1.0];
        let baseline = MajorityClassifier::fit(&y_test);
        let x_test = vec![vec![0.1], vec![0.2], vec![0.3], vec![0.4]];
        let result = evaluator.evaluate(&baseline, &x_test, &y_test).await.unwrap();

        assert_eq!(result.roc_auc, None);
        assert_eq!(result.model_name, "majority_class");
        assert!((result.accuracy - 0.75).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_empty_test_set_rejected() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ArtifactStore::open(dir.path()).unwrap());
        let evaluator = Evaluator::new(store, None);

        let (model, _, _) = fitted_model();
        let err = evaluator.evaluate(&model, &[], &[]).await.unwrap_err();
        assert!(matches!(err, EvaluationError::EmptyTestSet));
    }

    #[tokio::test]
    async fn test_mismatched_lengths_rejected() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ArtifactStore::open(dir.path()).unwrap());
        let evaluator = Evaluator::new(store, None);

        let (model, x_test, _) = fitted_model();
        let err = evaluator
            .evaluate(&model, &x_test, &[0.0])
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_confusion_csv_sums_to_test_rows() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ArtifactStore::open(dir.path()).unwrap());
        let evaluator = Evaluator::new(Arc::clone(&store), None);

        let (model, x_test, y_test) = fitted_model();
        evaluator.evaluate(&model, &x_test, &y_test).await.unwrap();

        let csv = String::from_utf8(store.get_bytes(layout::CONFUSION_MATRIX).unwrap()).unwrap();
        let total: u64 = csv
            .lines()
            .skip(1)
            .flat_map(|line| line.split(',').skip(1))
            .filter_map(|cell| cell.parse::<u64>().ok())
            .sum();
        assert_eq!(total, x_test.len() as u64);
    }
}
