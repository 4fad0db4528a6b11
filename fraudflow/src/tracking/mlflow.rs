//! MLflow tracking-server recorder.
//!
//! Speaks the plain REST surface: resolve or create the experiment, create
//! a run, log params and metrics in one batch, upload the tracked artifacts
//! through the proxied artifact endpoint, then close the run. Every failure
//! is folded into a single [`PublishWarning`] for the run outcome.

use crate::errors::{PublishWarning, RemoteStoreError};
use crate::store::ArtifactStore;
use crate::tracking::{RunRecord, RunSink};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SINK_NAME: &str = "mlflow";

/// Request timeout for tracking-server calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Records finished runs to an MLflow tracking server.
pub struct MlflowRecorder {
    client: reqwest::Client,
    endpoint: String,
    experiment: String,
    store: Arc<ArtifactStore>,
}

#[derive(Deserialize)]
struct ExperimentEnvelope {
    experiment: Experiment,
}

#[derive(Deserialize)]
struct Experiment {
    experiment_id: String,
}

#[derive(Deserialize)]
struct CreatedExperiment {
    experiment_id: String,
}

#[derive(Deserialize)]
struct RunEnvelope {
    run: Run,
}

#[derive(Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Deserialize)]
struct RunInfo {
    run_id: String,
}

impl MlflowRecorder {
    /// Creates a recorder for the given tracking server and experiment.
    pub fn new(
        endpoint: &str,
        experiment: &str,
        store: Arc<ArtifactStore>,
    ) -> Result<Self, RemoteStoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            experiment: experiment.to_string(),
            store,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{path}", self.endpoint)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, PublishWarning> {
        let url = self.api_url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(warn_of)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishWarning::new(
                SINK_NAME,
                format!("'{path}' returned status {status}"),
            ));
        }
        response.json().await.map_err(warn_of)
    }

    /// Resolves the experiment id, creating the experiment when the server
    /// does not know it yet.
    async fn ensure_experiment(&self) -> Result<String, PublishWarning> {
        let url = self.api_url("experiments/get-by-name");
        let response = self
            .client
            .get(&url)
            .query(&[("experiment_name", self.experiment.as_str())])
            .send()
            .await
            .map_err(warn_of)?;

        if response.status().is_success() {
            let envelope: ExperimentEnvelope = response.json().await.map_err(warn_of)?;
            return Ok(envelope.experiment.experiment_id);
        }

        let created: CreatedExperiment = self
            .post_json("experiments/create", &json!({ "name": self.experiment }))
            .await?;
        debug!(experiment = %self.experiment, id = %created.experiment_id, "created experiment");
        Ok(created.experiment_id)
    }

    async fn upload_artifact(
        &self,
        experiment_id: &str,
        run_id: &str,
        name: &str,
    ) -> Result<(), PublishWarning> {
        let bytes = self.store.get_bytes(name).map_err(warn_of)?;
        let filename = name.rsplit('/').next().unwrap_or(name);
        let url = format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{experiment_id}/{run_id}/artifacts/{filename}",
            self.endpoint
        );

        let response = self.client.put(&url).body(bytes).send().await.map_err(warn_of)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishWarning::new(
                SINK_NAME,
                format!("artifact upload '{filename}' returned status {status}"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RunSink for MlflowRecorder {
    fn name(&self) -> &str {
        SINK_NAME
    }

    async fn publish(&self, record: &RunRecord) -> Result<(), PublishWarning> {
        let experiment_id = self.ensure_experiment().await?;

        let created: RunEnvelope = self
            .post_json(
                "runs/create",
                &json!({
                    "experiment_id": experiment_id,
                    "run_name": record.run_id.to_string(),
                    "start_time": record.started_at.timestamp_millis(),
                }),
            )
            .await?;
        let run_id = created.run.info.run_id;

        let params: Vec<serde_json::Value> = record
            .params
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();
        let timestamp = record.finished_at.timestamp_millis();
        let metrics: Vec<serde_json::Value> = record
            .metrics
            .iter()
            .map(|(key, value)| {
                json!({ "key": key, "value": value, "timestamp": timestamp, "step": 0 })
            })
            .collect();
        self.post_json::<serde_json::Value>(
            "runs/log-batch",
            &json!({ "run_id": run_id, "params": params, "metrics": metrics }),
        )
        .await?;

        for name in &record.artifacts {
            self.upload_artifact(&experiment_id, &run_id, name).await?;
        }

        self.post_json::<serde_json::Value>(
            "runs/update",
            &json!({
                "run_id": run_id,
                "status": "FINISHED",
                "end_time": timestamp,
            }),
        )
        .await?;

        debug!(
            run_id = %run_id,
            experiment_id = %experiment_id,
            artifacts = record.artifacts.len(),
            "run recorded to tracking server"
        );
        Ok(())
    }
}

impl fmt::Debug for MlflowRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MlflowRecorder")
            .field("endpoint", &self.endpoint)
            .field("experiment", &self.experiment)
            .finish_non_exhaustive()
    }
}

fn warn_of(err: impl fmt::Display) -> PublishWarning {
    PublishWarning::new(SINK_NAME, err.to_string())
}
