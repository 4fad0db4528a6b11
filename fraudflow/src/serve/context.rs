//! Inference over persisted artifacts.
//!
//! The context loads the best model, the scaler, and the feature schema
//! once, then serves predictions from memory. The scaler is applied exactly
//! as fitted at training time, never refit. A retrain on disk is picked up
//! through [`InferenceContext::reload_if_stale`].

use crate::data::{FeatureSchema, StandardScaler};
use crate::errors::{ServeError, StoreError};
use crate::model::{BinaryEstimator, LogisticModel};
use crate::serve::FeatureRecord;
use crate::store::{layout, ArtifactStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

/// The label and optional fraud probability for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// `1` for fraud, `0` otherwise.
    pub label: u8,
    /// Probability of the fraud class, when the model exposes one.
    pub probability: Option<f64>,
}

impl Prediction {
    /// Returns true when the record was classified as fraud.
    #[must_use]
    pub fn is_fraud(&self) -> bool {
        self.label == 1
    }
}

struct LoadedArtifacts {
    model: LogisticModel,
    scaler: StandardScaler,
    schema: FeatureSchema,
    mtimes: [SystemTime; 3],
}

impl LoadedArtifacts {
    fn load(store: &ArtifactStore) -> Result<Self, ServeError> {
        let model = store
            .get_json(layout::BEST_MODEL)
            .map_err(missing_as_serve)?;
        let scaler = store.get_json(layout::SCALER).map_err(missing_as_serve)?;
        let schema = store
            .get_json(layout::FEATURE_NAMES)
            .map_err(missing_as_serve)?;
        let mtimes = Self::mtimes(store)?;

        Ok(Self {
            model,
            scaler,
            schema,
            mtimes,
        })
    }

    fn mtimes(store: &ArtifactStore) -> Result<[SystemTime; 3], ServeError> {
        Ok([
            store.modified(layout::BEST_MODEL).map_err(missing_as_serve)?,
            store.modified(layout::SCALER).map_err(missing_as_serve)?,
            store
                .modified(layout::FEATURE_NAMES)
                .map_err(missing_as_serve)?,
        ])
    }
}

fn missing_as_serve(err: StoreError) -> ServeError {
    match err {
        StoreError::Missing { path } => ServeError::MissingArtifact { path },
        other => ServeError::Store(other),
    }
}

/// Serves predictions from the persisted model, scaler, and schema.
///
/// Cheap to share; the loaded artifacts sit behind a read/write lock so
/// prediction is lock-read only.
pub struct InferenceContext {
    store: Arc<ArtifactStore>,
    inner: RwLock<LoadedArtifacts>,
}

impl std::fmt::Debug for InferenceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceContext").finish_non_exhaustive()
    }
}

impl InferenceContext {
    /// Loads the serving artifacts from the store.
    pub fn load(store: Arc<ArtifactStore>) -> Result<Self, ServeError> {
        let inner = LoadedArtifacts::load(&store)?;
        info!(
            features = inner.schema.len(),
            model = %inner.model.name(),
            "inference artifacts loaded"
        );
        Ok(Self {
            store,
            inner: RwLock::new(inner),
        })
    }

    /// Scores one record. Features must be supplied in schema order;
    /// arrange unordered input with [`FeatureRecord::arranged`] first.
    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, ServeError> {
        let inner = self.inner.read();
        let names = record.names();
        inner.schema.validate_names(&names)?;

        let scaled = inner.scaler.transform_row(&record.values())?;
        let label = u8::from(inner.model.predict(&scaled) > 0.5);
        let probability = inner.model.predict_proba(&scaled);
        Ok(Prediction { label, probability })
    }

    /// The schema prediction inputs must follow.
    #[must_use]
    pub fn schema(&self) -> FeatureSchema {
        self.inner.read().schema.clone()
    }

    /// Reloads the artifacts unconditionally.
    pub fn reload(&self) -> Result<(), ServeError> {
        let fresh = LoadedArtifacts::load(&self.store)?;
        *self.inner.write() = fresh;
        info!("inference artifacts reloaded");
        Ok(())
    }

    /// Reloads only when any serving artifact changed on disk since the
    /// last load. Returns whether a reload happened.
    pub fn reload_if_stale(&self) -> Result<bool, ServeError> {
        let current = LoadedArtifacts::mtimes(&self.store)?;
        if current == self.inner.read().mtimes {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }
}
