//! Append-only JSONL run log.
//!
//! The lightweight second tracker: one JSON line per finished run, written
//! to a local file that can live inside the published repository. No server,
//! no schema negotiation.

use crate::errors::PublishWarning;
use crate::tracking::{RunRecord, RunSink};
use async_trait::async_trait;
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

const SINK_NAME: &str = "runlog";

/// Appends each finished run as one JSON line.
#[derive(Debug, Clone)]
pub struct RunLogSink {
    path: PathBuf,
}

impl RunLogSink {
    /// Creates a sink appending to the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The log file's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RunSink for RunLogSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    async fn publish(&self, record: &RunRecord) -> Result<(), PublishWarning> {
        let line = serde_json::to_string(record).map_err(warn_of)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(warn_of)?;
            }
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(warn_of)?;
        file.write_all(line.as_bytes()).map_err(warn_of)?;
        file.write_all(b"\n").map_err(warn_of)?;

        debug!(run_id = %record.run_id, path = %self.path.display(), "run appended to log");
        Ok(())
    }
}

fn warn_of(err: impl fmt::Display) -> PublishWarning {
    PublishWarning::new(SINK_NAME, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassificationReport, ConfusionMatrix, EvaluationResult};
    use crate::store::ArtifactStore;
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn sample_record(store: &ArtifactStore) -> RunRecord {
        let confusion = ConfusionMatrix {
            true_negatives: 9,
            false_positives: 1,
            false_negatives: 0,
            true_positives: 2,
        };
        let evaluation = EvaluationResult {
            model_name: "logistic_regression".to_string(),
            accuracy: 11.0 / 12.0,
            roc_auc: Some(0.97),
            confusion,
            report: ClassificationReport::from_confusion(&confusion),
            n_test: 12,
            evaluated_at: Utc::now(),
        };
        RunRecord::from_evaluation(Uuid::new_v4(), "fraud-detection", Utc::now(), &evaluation, store)
    }

    #[tokio::test]
    async fn test_publish_appends_one_line_per_run() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path().join("artifacts")).unwrap();
        let sink = RunLogSink::new(dir.path().join("runs.jsonl"));

        let first = sample_record(&store);
        let second = sample_record(&store);
        sink.publish(&first).await.unwrap();
        sink.publish(&second).await.unwrap();

        let text = std::fs::read_to_string(sink.path()).unwrap();
        let parsed: Vec<RunRecord> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed, vec![first, second]);
    }

    #[tokio::test]
    async fn test_publish_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path().join("artifacts")).unwrap();
        let sink = RunLogSink::new(dir.path().join("logs/nested/runs.jsonl"));

        sink.publish(&sample_record(&store)).await.unwrap();
        assert!(sink.path().is_file());
    }
}
