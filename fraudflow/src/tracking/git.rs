//! Git publishing sink.
//!
//! Commits whatever the run left in the configured repository (artifacts,
//! run log) and pushes to the configured remote. A clean working tree is a
//! successful no-op; everything else that goes wrong becomes a warning.

use crate::config::PublishConfig;
use crate::errors::PublishWarning;
use crate::tracking::{RunRecord, RunSink};
use async_trait::async_trait;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};

const SINK_NAME: &str = "git";

/// Publishes run outputs by committing and pushing a git repository.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    config: PublishConfig,
}

impl GitPublisher {
    /// Creates a publisher for the `[publish]` configuration section.
    #[must_use]
    pub fn new(config: PublishConfig) -> Self {
        Self { config }
    }

    async fn git(&self, args: &[&str]) -> Result<Output, PublishWarning> {
        let mut command = Command::new("git");
        if let Some(dir) = &self.config.repo_dir {
            command.current_dir(dir);
        }
        command
            .args(args)
            .output()
            .await
            .map_err(|e| PublishWarning::new(SINK_NAME, format!("git {}: {e}", args.join(" "))))
    }
}

#[async_trait]
impl RunSink for GitPublisher {
    fn name(&self) -> &str {
        SINK_NAME
    }

    async fn publish(&self, record: &RunRecord) -> Result<(), PublishWarning> {
        let add = self.git(&["add", "-A"]).await?;
        if !add.status.success() {
            return Err(failure("add", &add));
        }

        let message = format!("pipeline run {}", record.run_id);
        let commit = self.git(&["commit", "-m", &message]).await?;
        if !commit.status.success() {
            let stdout = String::from_utf8_lossy(&commit.stdout);
            let stderr = String::from_utf8_lossy(&commit.stderr);
            if stdout.contains("nothing to commit") || stderr.contains("nothing to commit") {
                debug!(run_id = %record.run_id, "working tree clean, nothing to publish");
                return Ok(());
            }
            return Err(failure("commit", &commit));
        }

        let push = self
            .git(&["push", &self.config.git_remote, &self.config.git_branch])
            .await?;
        if !push.status.success() {
            return Err(failure("push", &push));
        }

        info!(
            run_id = %record.run_id,
            remote = %self.config.git_remote,
            branch = %self.config.git_branch,
            "run published"
        );
        Ok(())
    }
}

fn failure(op: &str, output: &Output) -> PublishWarning {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = stderr.trim();
    let message = if detail.is_empty() {
        format!("git {op} exited with {}", output.status)
    } else {
        format!("git {op} failed: {detail}")
    };
    PublishWarning::new(SINK_NAME, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassificationReport, ConfusionMatrix, EvaluationResult};
    use crate::store::ArtifactStore;
    use chrono::Utc;
    use std::path::Path;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn sample_record(store: &ArtifactStore) -> RunRecord {
        let confusion = ConfusionMatrix {
            true_negatives: 3,
            false_positives: 0,
            false_negatives: 0,
            true_positives: 1,
        };
        let evaluation = EvaluationResult {
            model_name: "logistic_regression".to_string(),
            accuracy: 1.0,
            roc_auc: None,
            confusion,
            report: ClassificationReport::from_confusion(&confusion),
            n_test: 4,
            evaluated_at: Utc::now(),
        };
        RunRecord::from_evaluation(Uuid::new_v4(), "fraud-detection", Utc::now(), &evaluation, store)
    }

    fn init_repo(dir: &Path) {
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.email", "pipeline@test.invalid"],
            vec!["config", "user.name", "pipeline"],
        ] {
            let status = std::process::Command::new("git")
                .current_dir(dir)
                .args(&args)
                .status()
                .unwrap();
            assert!(status.success(), "git {args:?} failed");
        }
    }

    #[tokio::test]
    async fn test_missing_repo_is_a_warning() {
        let publisher = GitPublisher::new(PublishConfig {
            git_remote: "origin".to_string(),
            git_branch: "main".to_string(),
            repo_dir: Some("/nonexistent/fraudflow-repo".into()),
        });

        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let warning = publisher.publish(&sample_record(&store)).await.unwrap_err();
        assert_eq!(warning.sink, "git");
    }

    #[tokio::test]
    async fn test_clean_tree_is_a_successful_noop() {
        let repo = TempDir::new().unwrap();
        init_repo(repo.path());

        let publisher = GitPublisher::new(PublishConfig {
            git_remote: "origin".to_string(),
            git_branch: "main".to_string(),
            repo_dir: Some(repo.path().to_path_buf()),
        });

        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        publisher.publish(&sample_record(&store)).await.unwrap();
    }

    #[tokio::test]
    async fn test_push_without_remote_is_a_warning() {
        let repo = TempDir::new().unwrap();
        init_repo(repo.path());
        std::fs::write(repo.path().join("runs.jsonl"), "{}\n").unwrap();

        let publisher = GitPublisher::new(PublishConfig {
            git_remote: "origin".to_string(),
            git_branch: "main".to_string(),
            repo_dir: Some(repo.path().to_path_buf()),
        });

        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let warning = publisher.publish(&sample_record(&store)).await.unwrap_err();
        assert_eq!(warning.sink, "git");
        assert!(warning.message.contains("push"));
    }
}
