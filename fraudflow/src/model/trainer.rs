//! Baseline model training.

use crate::errors::TrainingError;
use crate::model::{FitConfig, HyperParams, LogisticModel};
use crate::store::{layout, mirror_artifact, ArtifactStore, RemoteStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Fits the baseline classifier on the training split and persists it.
///
/// The baseline always uses the default hyperparameters; there is no other
/// configuration surface. Non-convergence is logged and flagged on the
/// persisted model, never raised.
pub struct ModelTrainer {
    store: Arc<ArtifactStore>,
    remote: Option<Arc<dyn RemoteStore>>,
}

impl ModelTrainer {
    /// Creates a trainer writing to the given store, mirroring to the remote
    /// when one is configured.
    #[must_use]
    pub fn new(store: Arc<ArtifactStore>, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self { store, remote }
    }

    /// Fits the baseline model and persists it as an artifact.
    pub async fn train(
        &self,
        x_train: &[Vec<f64>],
        y_train: &[f64],
    ) -> Result<LogisticModel, TrainingError> {
        let started = Instant::now();
        let model = LogisticModel::fit(
            x_train,
            y_train,
            HyperParams::default(),
            FitConfig::default(),
        )?;

        if !model.converged {
            warn!(
                iterations = model.n_iter,
                "baseline optimizer stopped before reaching tolerance"
            );
        }

        self.store.put_json(layout::BASELINE_MODEL, &model)?;
        if let Some(remote) = &self.remote {
            let bytes = self.store.get_bytes(layout::BASELINE_MODEL)?;
            mirror_artifact(remote.as_ref(), layout::BASELINE_MODEL, &bytes).await;
        }

        info!(
            rows = x_train.len(),
            converged = model.converged,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "baseline model trained"
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn separable() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x = vec![
            vec![-2.0, 0.5],
            vec![-1.0, 0.3],
            vec![-0.5, 0.1],
            vec![0.5, -0.1],
            vec![1.0, -0.3],
            vec![2.0, -0.5],
        ];
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[tokio::test]
    async fn test_train_persists_baseline() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ArtifactStore::open(dir.path()).unwrap());
        let trainer = ModelTrainer::new(Arc::clone(&store), None);

        let (x, y) = separable();
        let model = trainer.train(&x, &y).await.unwrap();

        let persisted: LogisticModel = store.get_json(layout::BASELINE_MODEL).unwrap();
        assert_eq!(persisted, model);
        assert_eq!(model.hyper, HyperParams::default());
    }

    #[tokio::test]
    async fn test_train_rejects_empty_split() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ArtifactStore::open(dir.path()).unwrap());
        let trainer = ModelTrainer::new(store, None);

        let err = trainer.train(&[], &[]).await.unwrap_err();
        assert!(matches!(err, TrainingError::EmptyTrainingSet));
    }
}
