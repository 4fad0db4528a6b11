//! Pipeline orchestration.
//!
//! Drives the stage sequence Ingesting -> Processing -> Training -> Tuning
//! -> Evaluating -> Recording -> Publishing over one artifact store. The
//! first five stages are mandatory and abort the run on failure; the last
//! two only collect warnings. A run is skipped outright when the model
//! artifacts already exist and no force-retrain flag is set.

use crate::config::PipelineConfig;
use crate::data::{DataIngestor, DataProcessor};
use crate::errors::{ConfigError, PipelineError, PublishWarning, StageFailure};
use crate::model::{Evaluator, ModelTrainer, Tuner};
use crate::pipeline::{PipelineState, RunOutcome, StageReport};
use crate::store::{layout, ArtifactStore, HttpObjectStore, RemoteStore};
use crate::tracking::{
    GitPublisher, MlflowRecorder, RemoteMirrorSink, RunLogSink, RunRecord, RunSink,
};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Flags controlling one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Record the run to the configured experiment trackers.
    pub use_experiment_tracking: bool,
    /// Retrain even when model artifacts already exist.
    pub force_retrain: bool,
}

/// Sequences the pipeline stages and owns their shared collaborators.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    store: Arc<ArtifactStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    extra_recorders: Vec<Arc<dyn RunSink>>,
    extra_publishers: Vec<Arc<dyn RunSink>>,
}

impl PipelineOrchestrator {
    /// Opens the artifact store and, when configured, the remote store.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let store = Arc::new(ArtifactStore::open(&config.artifacts.root)?);
        let remote: Option<Arc<dyn RemoteStore>> = match &config.remote {
            Some(remote_config) => {
                let client = HttpObjectStore::from_config(remote_config)
                    .map_err(|e| ConfigError::invalid("remote", e.to_string()))?;
                Some(Arc::new(client))
            }
            None => None,
        };

        Ok(Self {
            config,
            store,
            remote,
            extra_recorders: Vec::new(),
            extra_publishers: Vec::new(),
        })
    }

    /// Replaces the remote store. Tests inject in-memory stores through
    /// this.
    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Adds a recording sink that fires regardless of configuration.
    #[must_use]
    pub fn with_recorder(mut self, sink: Arc<dyn RunSink>) -> Self {
        self.extra_recorders.push(sink);
        self
    }

    /// Adds a publishing sink that fires regardless of configuration.
    #[must_use]
    pub fn with_publisher(mut self, sink: Arc<dyn RunSink>) -> Self {
        self.extra_publishers.push(sink);
        self
    }

    /// The orchestrator's artifact store.
    #[must_use]
    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Runs the pipeline end to end.
    ///
    /// Returns the evaluation-bearing outcome, or the first mandatory-stage
    /// error wrapped with the stage that raised it.
    pub async fn run(&self, options: RunOptions) -> Result<RunOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let started_at = Utc::now();
        info!(
            run_id = %run_id,
            force_retrain = options.force_retrain,
            tracking = options.use_experiment_tracking,
            "pipeline run started"
        );

        if !options.force_retrain && self.store.has_model_artifacts() {
            let evaluation = self.store.get_json(layout::EVALUATION_RESULTS).ok();
            info!(run_id = %run_id, "model artifacts already exist, skipping run");
            return Ok(RunOutcome {
                run_id,
                skipped: true,
                evaluation,
                reports: Vec::new(),
                warnings: Vec::new(),
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        let mut reports = Vec::new();

        let table = timed(&mut reports, PipelineState::Ingesting, async {
            let ingestor = DataIngestor::from_config(
                &self.config,
                Arc::clone(&self.store),
                self.remote.clone(),
            )?;
            Ok(ingestor.run().await?)
        })
        .await?;

        let prepared = timed(&mut reports, PipelineState::Processing, async {
            let processor = DataProcessor::new(
                self.config.processing.clone(),
                Arc::clone(&self.store),
                self.remote.clone(),
            );
            processor.preprocess(Some(table)).await
        })
        .await?;

        timed(&mut reports, PipelineState::Training, async {
            let trainer = ModelTrainer::new(Arc::clone(&self.store), self.remote.clone());
            Ok(trainer
                .train(&prepared.split.x_train, &prepared.split.y_train)
                .await?)
        })
        .await?;

        let best = timed(&mut reports, PipelineState::Tuning, async {
            let tuner = Tuner::new(Arc::clone(&self.store), self.remote.clone());
            Ok(tuner
                .tune(&prepared.split.x_train, &prepared.split.y_train)
                .await?)
        })
        .await?;

        let evaluation = timed(&mut reports, PipelineState::Evaluating, async {
            let evaluator = Evaluator::new(Arc::clone(&self.store), self.remote.clone());
            Ok(evaluator
                .evaluate(&best, &prepared.split.x_test, &prepared.split.y_test)
                .await?)
        })
        .await?;

        let mut warnings = Vec::new();
        let tracking = self.config.tracking.clone().unwrap_or_default();
        let record = RunRecord::from_evaluation(
            run_id,
            &tracking.experiment,
            started_at,
            &evaluation,
            &self.store,
        );

        let mut recorders: Vec<Arc<dyn RunSink>> = Vec::new();
        if options.use_experiment_tracking {
            if let Some(endpoint) = &tracking.endpoint {
                match MlflowRecorder::new(endpoint, &tracking.experiment, Arc::clone(&self.store))
                {
                    Ok(recorder) => recorders.push(Arc::new(recorder)),
                    Err(e) => warnings.push(PublishWarning::new("mlflow", e.to_string())),
                }
            }
            if let Some(path) = &tracking.run_log {
                recorders.push(Arc::new(RunLogSink::new(path.clone())));
            }
        }
        recorders.extend(self.extra_recorders.iter().cloned());
        deliver(
            &mut reports,
            PipelineState::Recording,
            &recorders,
            &record,
            &mut warnings,
        )
        .await;

        let mut publishers: Vec<Arc<dyn RunSink>> = Vec::new();
        if let Some(remote) = &self.remote {
            publishers.push(Arc::new(RemoteMirrorSink::new(
                Arc::clone(&self.store),
                Arc::clone(remote),
            )));
        }
        if let Some(publish) = &self.config.publish {
            publishers.push(Arc::new(GitPublisher::new(publish.clone())));
        }
        publishers.extend(self.extra_publishers.iter().cloned());
        deliver(
            &mut reports,
            PipelineState::Publishing,
            &publishers,
            &record,
            &mut warnings,
        )
        .await;

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            accuracy = evaluation.accuracy,
            warnings = warnings.len(),
            duration_ms,
            "pipeline run complete"
        );
        Ok(RunOutcome {
            run_id,
            skipped: false,
            evaluation: Some(evaluation),
            reports,
            warnings,
            duration_ms,
        })
    }
}

/// Runs one mandatory stage, recording its report and wrapping any failure
/// with the stage that raised it.
async fn timed<T, F>(
    reports: &mut Vec<StageReport>,
    stage: PipelineState,
    work: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    info!(stage = %stage, "stage started");
    let started = Instant::now();
    match work.await {
        Ok(value) => {
            let duration_ms = started.elapsed().as_millis() as u64;
            reports.push(StageReport::completed(stage, duration_ms));
            info!(stage = %stage, duration_ms, "stage completed");
            Ok(value)
        }
        Err(source) => {
            let duration_ms = started.elapsed().as_millis() as u64;
            error!(stage = %stage, duration_ms, error = %source, "stage failed");
            reports.push(StageReport::failed(stage, duration_ms, source.to_string()));
            Err(StageFailure::new(stage, source).into())
        }
    }
}

/// Fans the record out to every sink of one best-effort stage.
async fn deliver(
    reports: &mut Vec<StageReport>,
    stage: PipelineState,
    sinks: &[Arc<dyn RunSink>],
    record: &RunRecord,
    warnings: &mut Vec<PublishWarning>,
) {
    if sinks.is_empty() {
        reports.push(StageReport::skipped(stage));
        return;
    }

    info!(stage = %stage, sinks = sinks.len(), "stage started");
    let started = Instant::now();
    for sink in sinks {
        if let Err(warning) = sink.publish(record).await {
            warn!(
                stage = %stage,
                sink = %warning.sink,
                message = %warning.message,
                "sink failed, continuing"
            );
            warnings.push(warning);
        }
    }
    let duration_ms = started.elapsed().as_millis() as u64;
    reports.push(StageReport::completed(stage, duration_ms));
    info!(stage = %stage, duration_ms, "stage completed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArtifactConfig, IngestionConfig, ProcessingConfig};
    use crate::errors::RemoteStoreError;
    use crate::pipeline::StageStatus;
    use crate::testing::{punch_missing, TransactionGenerator};
    use crate::tracking::{CollectingRunSink, FailingRunSink};
    use std::fmt::Write as _;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_source(dir: &Path) {
        let mut csv = String::from("amount,age,label\n");
        for i in 0..30 {
            let _ = writeln!(csv, "{},{},0", 10.0 + f64::from(i) * 0.3, 30 + i % 10);
        }
        for i in 0..30 {
            let _ = writeln!(csv, "{},{},1", 200.0 + f64::from(i) * 2.0, 40 + i % 10);
        }
        std::fs::write(dir.join("transactions.csv"), csv).unwrap();
    }

    fn test_config(root: &Path, source_dir: &Path) -> PipelineConfig {
        PipelineConfig {
            ingestion: Some(IngestionConfig {
                source_location: "datasets/fraud".to_string(),
                source_files: vec!["transactions.csv".to_string()],
                local_source_dir: Some(source_dir.to_path_buf()),
            }),
            processing: ProcessingConfig {
                test_fraction: 0.2,
                seed: 42,
                label_column: None,
            },
            artifacts: ArtifactConfig {
                root: root.to_path_buf(),
            },
            remote: None,
            tracking: None,
            publish: None,
        }
    }

    fn orchestrator(dir: &TempDir) -> PipelineOrchestrator {
        let source_dir = dir.path().join("sources");
        std::fs::create_dir_all(&source_dir).unwrap();
        write_source(&source_dir);

        let config = test_config(&dir.path().join("artifacts"), &source_dir);
        PipelineOrchestrator::from_config(config).unwrap()
    }

    #[tokio::test]
    async fn test_full_run_produces_artifacts() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir);

        let outcome = orchestrator.run(RunOptions::default()).await.unwrap();

        assert!(!outcome.skipped);
        assert!(outcome.is_clean());
        let evaluation = outcome.evaluation.unwrap();
        assert!(evaluation.accuracy > 0.9, "accuracy {}", evaluation.accuracy);
        assert!(orchestrator.store().has_model_artifacts());

        let statuses: Vec<(PipelineState, StageStatus)> = outcome
            .reports
            .iter()
            .map(|r| (r.stage, r.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                (PipelineState::Ingesting, StageStatus::Completed),
                (PipelineState::Processing, StageStatus::Completed),
                (PipelineState::Training, StageStatus::Completed),
                (PipelineState::Tuning, StageStatus::Completed),
                (PipelineState::Evaluating, StageStatus::Completed),
                (PipelineState::Recording, StageStatus::Skipped),
                (PipelineState::Publishing, StageStatus::Skipped),
            ]
        );
    }

    #[tokio::test]
    async fn test_second_run_skips_and_returns_cached_evaluation() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir);

        let first = orchestrator.run(RunOptions::default()).await.unwrap();
        let second = orchestrator.run(RunOptions::default()).await.unwrap();

        assert!(second.skipped);
        assert!(second.reports.is_empty());
        assert_eq!(
            second.evaluation.as_ref().map(|e| e.accuracy),
            first.evaluation.as_ref().map(|e| e.accuracy)
        );
    }

    #[tokio::test]
    async fn test_force_retrain_overrides_skip() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir);

        orchestrator.run(RunOptions::default()).await.unwrap();
        let rerun = orchestrator
            .run(RunOptions {
                force_retrain: true,
                ..RunOptions::default()
            })
            .await
            .unwrap();

        assert!(!rerun.skipped);
        assert_eq!(rerun.reports.len(), 7);
    }

    #[tokio::test]
    async fn test_failing_sink_warns_without_aborting() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir)
            .with_recorder(Arc::new(FailingRunSink::new("mlflow", "connection refused")));

        let outcome = orchestrator
            .run(RunOptions {
                use_experiment_tracking: true,
                ..RunOptions::default()
            })
            .await
            .unwrap();

        assert!(!outcome.skipped);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].sink, "mlflow");

        let recording = outcome
            .reports
            .iter()
            .find(|r| r.stage == PipelineState::Recording)
            .unwrap();
        assert_eq!(recording.status, StageStatus::Completed);
    }

    #[tokio::test]
    async fn test_collecting_sink_receives_the_record() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(CollectingRunSink::new());
        let orchestrator = orchestrator(&dir).with_recorder(sink.clone());

        let outcome = orchestrator.run(RunOptions::default()).await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].run_id, outcome.run_id);
        assert_eq!(
            records[0].params.get("model_type").map(String::as_str),
            Some("LogisticRegression")
        );
        assert!(records[0].metrics.contains_key("accuracy"));
        assert!(!records[0].artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_missing_ingestion_config_fails_in_ingesting() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir.path().join("artifacts"), dir.path());
        config.ingestion = None;
        let orchestrator = PipelineOrchestrator::from_config(config).unwrap();

        let err = orchestrator.run(RunOptions::default()).await.unwrap_err();
        match err {
            PipelineError::Stage(failure) => {
                assert_eq!(failure.stage, PipelineState::Ingesting);
            }
            other => panic!("expected stage failure, got {other}"),
        }
    }

    struct FakeRemote {
        objects: dashmap::DashMap<String, Vec<u8>>,
        fail_uploads: bool,
    }

    impl FakeRemote {
        fn new(fail_uploads: bool) -> Self {
            Self {
                objects: dashmap::DashMap::new(),
                fail_uploads,
            }
        }

        fn seed(&self, object: &str, bytes: &[u8]) {
            self.objects.insert(object.to_string(), bytes.to_vec());
        }
    }

    #[async_trait::async_trait]
    impl RemoteStore for FakeRemote {
        async fn download(&self, object: &str) -> Result<Vec<u8>, RemoteStoreError> {
            self.objects
                .get(object)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| RemoteStoreError::Status {
                    status: 404,
                    object: object.to_string(),
                })
        }

        async fn upload(&self, object: &str, bytes: &[u8]) -> Result<(), RemoteStoreError> {
            if self.fail_uploads {
                return Err(RemoteStoreError::Status {
                    status: 503,
                    object: object.to_string(),
                });
            }
            self.objects.insert(object.to_string(), bytes.to_vec());
            Ok(())
        }

        fn location(&self) -> String {
            "memory://fake".to_string()
        }
    }

    fn remote_config(root: &Path) -> PipelineConfig {
        PipelineConfig {
            ingestion: Some(IngestionConfig {
                source_location: "datasets/fraud".to_string(),
                source_files: vec!["transactions.csv".to_string()],
                local_source_dir: None,
            }),
            processing: ProcessingConfig::default(),
            artifacts: ArtifactConfig {
                root: root.to_path_buf(),
            },
            remote: None,
            tracking: None,
            publish: None,
        }
    }

    fn generated_csv() -> Vec<u8> {
        let table = TransactionGenerator::new(300)
            .with_fraud_rate(0.3)
            .with_seed(9)
            .build()
            .unwrap();
        let punched = punch_missing(&table, 10, 5).unwrap();
        punched.to_csv_bytes().unwrap()
    }

    #[tokio::test]
    async fn test_generated_data_end_to_end_with_remote() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(FakeRemote::new(false));
        remote.seed("datasets/fraud/transactions.csv", &generated_csv());

        let config = remote_config(&dir.path().join("artifacts"));
        let orchestrator = PipelineOrchestrator::from_config(config)
            .unwrap()
            .with_remote(remote.clone());

        let outcome = orchestrator.run(RunOptions::default()).await.unwrap();

        assert!(!outcome.skipped);
        assert!(outcome.is_clean());
        let evaluation = outcome.evaluation.unwrap();
        assert!(evaluation.accuracy >= 0.6, "accuracy {}", evaluation.accuracy);
        // 290 complete rows survive the punched nulls; test split is
        // ceil(290 * 0.2).
        assert_eq!(evaluation.n_test, 58);
        assert_eq!(evaluation.confusion.total(), 58);

        let publishing = outcome
            .reports
            .iter()
            .find(|r| r.stage == PipelineState::Publishing)
            .unwrap();
        assert_eq!(publishing.status, StageStatus::Completed);
        assert!(remote.objects.contains_key(layout::BEST_MODEL));
        assert!(remote.objects.contains_key(layout::EVALUATION_RESULTS));
    }

    #[tokio::test]
    async fn test_failing_remote_uploads_degrade_to_warnings() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(FakeRemote::new(true));
        remote.seed("datasets/fraud/transactions.csv", &generated_csv());

        let config = remote_config(&dir.path().join("artifacts"));
        let orchestrator = PipelineOrchestrator::from_config(config)
            .unwrap()
            .with_remote(remote);

        let outcome = orchestrator.run(RunOptions::default()).await.unwrap();

        assert!(!outcome.skipped);
        assert!(outcome.evaluation.is_some());
        assert!(orchestrator.store().has_model_artifacts());
        assert!(outcome.warnings.iter().any(|w| w.sink == "remote_mirror"));
    }
}
