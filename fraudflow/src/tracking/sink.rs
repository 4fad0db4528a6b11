//! Run sink trait and the record sinks consume.

use crate::errors::PublishWarning;
use crate::model::{ConfusionMatrix, EvaluationResult, MAX_ITER};
use crate::store::{layout, ArtifactStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// Everything a sink may want to know about one finished run.
///
/// Params and metrics use ordered maps so serialized records are stable
/// across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// Experiment the run belongs to.
    pub experiment: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the record was built.
    pub finished_at: DateTime<Utc>,
    /// Fixed hyperparameters, stringly typed the way trackers expect them.
    pub params: BTreeMap<String, String>,
    /// Scalar metrics of the evaluation.
    pub metrics: BTreeMap<String, f64>,
    /// Outcome counts on the held-out split.
    pub confusion: ConfusionMatrix,
    /// Store-relative paths of the artifacts attached to the run.
    pub artifacts: Vec<String>,
}

impl RunRecord {
    /// Builds the record for a finished run from its evaluation.
    ///
    /// Only artifacts that actually exist in the store are attached.
    #[must_use]
    pub fn from_evaluation(
        run_id: Uuid,
        experiment: &str,
        started_at: DateTime<Utc>,
        evaluation: &EvaluationResult,
        store: &ArtifactStore,
    ) -> Self {
        let mut params = BTreeMap::new();
        params.insert("model_type".to_string(), "LogisticRegression".to_string());
        params.insert("max_iter".to_string(), MAX_ITER.to_string());

        let mut metrics = BTreeMap::new();
        metrics.insert("accuracy".to_string(), evaluation.accuracy);
        if let Some(auc) = evaluation.roc_auc {
            metrics.insert("roc_auc".to_string(), auc);
        }

        let artifacts = layout::TRACKED_ARTIFACTS
            .iter()
            .filter(|name| store.exists(name))
            .map(|name| (*name).to_string())
            .collect();

        Self {
            run_id,
            experiment: experiment.to_string(),
            started_at,
            finished_at: Utc::now(),
            params,
            metrics,
            confusion: evaluation.confusion,
            artifacts,
        }
    }
}

/// A destination for finished-run records.
///
/// Sinks are fire-and-forget relative to the pipeline: a failed publish is
/// a [`PublishWarning`] on the outcome, never an abort. No sink is ever
/// consulted for control decisions.
#[async_trait]
pub trait RunSink: Send + Sync {
    /// The sink's name for logs and warnings.
    fn name(&self) -> &str;

    /// Delivers the record.
    async fn publish(&self, record: &RunRecord) -> Result<(), PublishWarning>;
}

/// A sink that discards every record.
///
/// Used as the default when no tracker is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRunSink;

#[async_trait]
impl RunSink for NoOpRunSink {
    fn name(&self) -> &str {
        "noop"
    }

    async fn publish(&self, _record: &RunRecord) -> Result<(), PublishWarning> {
        // Intentionally empty - discards all records
        Ok(())
    }
}

/// A sink that logs each record through the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRunSink;

#[async_trait]
impl RunSink for LoggingRunSink {
    fn name(&self) -> &str {
        "logging"
    }

    async fn publish(&self, record: &RunRecord) -> Result<(), PublishWarning> {
        info!(
            run_id = %record.run_id,
            experiment = %record.experiment,
            metrics = ?record.metrics,
            artifacts = record.artifacts.len(),
            "run recorded"
        );
        Ok(())
    }
}

/// A collecting sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingRunSink {
    records: parking_lot::RwLock<Vec<RunRecord>>,
}

impl CollectingRunSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected records.
    #[must_use]
    pub fn records(&self) -> Vec<RunRecord> {
        self.records.read().clone()
    }

    /// Returns the number of collected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no record was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RunSink for CollectingRunSink {
    fn name(&self) -> &str {
        "collecting"
    }

    async fn publish(&self, record: &RunRecord) -> Result<(), PublishWarning> {
        self.records.write().push(record.clone());
        Ok(())
    }
}

/// A sink that fails every publish, for exercising warning paths.
#[derive(Debug, Clone)]
pub struct FailingRunSink {
    name: String,
    message: String,
}

impl FailingRunSink {
    /// Creates a sink that fails with the given message.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl RunSink for FailingRunSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, _record: &RunRecord) -> Result<(), PublishWarning> {
        Err(PublishWarning::new(self.name.clone(), self.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record(store: &ArtifactStore) -> RunRecord {
        let evaluation = EvaluationResult {
            model_name: "logistic_regression".to_string(),
            accuracy: 0.95,
            roc_auc: Some(0.9),
            confusion: ConfusionMatrix {
                true_negatives: 90,
                false_positives: 2,
                false_negatives: 3,
                true_positives: 5,
            },
            report: crate::model::ClassificationReport::from_confusion(&ConfusionMatrix {
                true_negatives: 90,
                false_positives: 2,
                false_negatives: 3,
                true_positives: 5,
            }),
            n_test: 100,
            evaluated_at: Utc::now(),
        };
        RunRecord::from_evaluation(Uuid::new_v4(), "fraud-detection", Utc::now(), &evaluation, store)
    }

    #[test]
    fn test_record_params_and_metrics() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let record = sample_record(&store);

        assert_eq!(
            record.params.get("model_type").map(String::as_str),
            Some("LogisticRegression")
        );
        assert_eq!(record.params.get("max_iter").map(String::as_str), Some("1000"));
        assert_eq!(record.metrics.get("accuracy"), Some(&0.95));
        assert_eq!(record.metrics.get("roc_auc"), Some(&0.9));
    }

    #[test]
    fn test_record_attaches_only_existing_artifacts() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        let record = sample_record(&store);
        assert!(record.artifacts.is_empty());

        store.put_text(layout::CLASSIFICATION_REPORT, "report").unwrap();
        store.put_text(layout::CONFUSION_MATRIX, "csv").unwrap();
        let record = sample_record(&store);
        assert_eq!(
            record.artifacts,
            vec![
                layout::CLASSIFICATION_REPORT.to_string(),
                layout::CONFUSION_MATRIX.to_string()
            ]
        );
    }

    #[test]
    fn test_auc_metric_absent_when_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let mut record = sample_record(&store);
        record.metrics.remove("roc_auc");

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("roc_auc"));
    }

    #[tokio::test]
    async fn test_collecting_sink_stores_records() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let sink = CollectingRunSink::new();
        assert!(sink.is_empty());

        let record = sample_record(&store);
        sink.publish(&record).await.unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0], record);
    }

    #[tokio::test]
    async fn test_failing_sink_produces_warning() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let sink = FailingRunSink::new("mlflow", "connection refused");

        let warning = sink.publish(&sample_record(&store)).await.unwrap_err();
        assert_eq!(warning.sink, "mlflow");
        assert_eq!(warning.message, "connection refused");
    }

    #[tokio::test]
    async fn test_noop_sink_accepts_everything() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        NoOpRunSink.publish(&sample_record(&store)).await.unwrap();
        LoggingRunSink.publish(&sample_record(&store)).await.unwrap();
    }
}
