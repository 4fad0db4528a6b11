//! Local artifact store.
//!
//! Artifacts are named byte blobs under a fixed directory tree. Every write
//! records a manifest entry (sha256 digest, byte length, written-at
//! timestamp); the manifest is persisted next to the artifacts and is what
//! the publishing step mirrors. Artifacts are overwritten on retrain, never
//! mutated in place.

use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Relative paths of the artifacts the pipeline produces.
pub mod layout {
    /// Directory raw sources land in.
    pub const RAW_DIR: &str = "raw";
    /// Directory the preprocessing artifacts land in.
    pub const PREPROCESSED_DIR: &str = "preprocessed";
    /// Directory the fitted models land in.
    pub const MODELS_DIR: &str = "models";
    /// Directory the evaluation reports land in.
    pub const REPORTS_DIR: &str = "reports";

    /// The concatenated raw dataset.
    pub const COMBINED_RAW: &str = "raw/combined.csv";
    /// The split feature matrices and label vectors.
    pub const DATASET: &str = "preprocessed/dataset.json";
    /// The fitted standardizer.
    pub const SCALER: &str = "preprocessed/scaler.json";
    /// The ordered feature schema.
    pub const FEATURE_NAMES: &str = "preprocessed/feature_names.json";
    /// The baseline model fitted with default hyperparameters.
    pub const BASELINE_MODEL: &str = "models/logistic_regression.json";
    /// The grid-search winner refit on the full training split.
    pub const BEST_MODEL: &str = "models/best_model.json";
    /// The serialized evaluation result.
    pub const EVALUATION_RESULTS: &str = "reports/evaluation_results.json";
    /// The plain-text per-class report.
    pub const CLASSIFICATION_REPORT: &str = "reports/classification_report.txt";
    /// The confusion matrix in CSV form.
    pub const CONFUSION_MATRIX: &str = "reports/confusion_matrix.csv";
    /// The store's digest index.
    pub const MANIFEST: &str = "manifest.json";

    /// Directories created on demand when the store opens.
    pub const DIRS: [&str; 4] = [RAW_DIR, PREPROCESSED_DIR, MODELS_DIR, REPORTS_DIR];

    /// Artifacts that must all exist for the skip-if-exists policy to fire.
    pub const MODEL_ARTIFACTS: [&str; 4] =
        [BASELINE_MODEL, BEST_MODEL, SCALER, FEATURE_NAMES];

    /// Artifacts attached to every recorded run.
    pub const TRACKED_ARTIFACTS: [&str; 5] = [
        SCALER,
        FEATURE_NAMES,
        EVALUATION_RESULTS,
        CLASSIFICATION_REPORT,
        CONFUSION_MATRIX,
    ];
}

/// One manifest entry per written artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Store-relative path, forward slashes.
    pub path: String,
    /// Hex sha256 digest of the written bytes.
    pub sha256: String,
    /// Byte length.
    pub bytes: u64,
    /// When the artifact was written.
    pub written_at: DateTime<Utc>,
}

/// The local artifact store.
///
/// Cheap to share behind an `Arc`; the manifest index is concurrent.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    manifest: DashMap<String, ManifestEntry>,
}

impl ArtifactStore {
    /// Opens a store rooted at `root`, creating the directory tree on demand
    /// and loading a persisted manifest when one exists.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();

        for dir in layout::DIRS {
            let path = root.join(dir);
            std::fs::create_dir_all(&path)
                .map_err(|source| StoreError::CreateDir { path, source })?;
        }

        let manifest = DashMap::new();
        let manifest_path = root.join(layout::MANIFEST);
        if manifest_path.exists() {
            let bytes = std::fs::read(&manifest_path).map_err(|source| StoreError::Read {
                path: manifest_path.clone(),
                source,
            })?;
            let persisted: BTreeMap<String, ManifestEntry> =
                serde_json::from_slice(&bytes).map_err(|source| StoreError::Deserialize {
                    path: manifest_path,
                    source,
                })?;
            for (key, entry) in persisted {
                manifest.insert(key, entry);
            }
        }

        Ok(Self { root, manifest })
    }

    /// Returns the store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the absolute path of a store-relative artifact.
    #[must_use]
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Returns true if the artifact exists on disk.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    /// Returns true if every artifact the skip policy checks exists.
    #[must_use]
    pub fn has_model_artifacts(&self) -> bool {
        layout::MODEL_ARTIFACTS.iter().all(|name| self.exists(name))
    }

    /// Writes raw bytes, records the manifest entry, and persists the
    /// manifest.
    pub fn put_bytes(&self, name: &str, bytes: &[u8]) -> Result<ManifestEntry, StoreError> {
        let path = self.path_of(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(&path, bytes).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;

        let entry = ManifestEntry {
            path: name.to_string(),
            sha256: sha256_hex(bytes),
            bytes: bytes.len() as u64,
            written_at: Utc::now(),
        };
        self.manifest.insert(name.to_string(), entry.clone());
        self.persist_manifest()?;

        debug!(artifact = %name, bytes = entry.bytes, "wrote artifact");
        Ok(entry)
    }

    /// Serializes a value as JSON and writes it.
    pub fn put_json<T: Serialize>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<ManifestEntry, StoreError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
            name: name.to_string(),
            source,
        })?;
        self.put_bytes(name, &bytes)
    }

    /// Writes a plain-text artifact.
    pub fn put_text(&self, name: &str, text: &str) -> Result<ManifestEntry, StoreError> {
        self.put_bytes(name, text.as_bytes())
    }

    /// Reads an artifact's bytes.
    pub fn get_bytes(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_of(name);
        if !path.is_file() {
            return Err(StoreError::Missing { path });
        }
        std::fs::read(&path).map_err(|source| StoreError::Read { path, source })
    }

    /// Reads and deserializes a JSON artifact.
    pub fn get_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        let bytes = self.get_bytes(name)?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Deserialize {
            path: self.path_of(name),
            source,
        })
    }

    /// Returns the artifact's last-modified time.
    pub fn modified(&self, name: &str) -> Result<SystemTime, StoreError> {
        let path = self.path_of(name);
        if !path.is_file() {
            return Err(StoreError::Missing { path });
        }
        let metadata =
            std::fs::metadata(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
        metadata.modified().map_err(|source| StoreError::Read { path, source })
    }

    /// Returns the manifest entry for an artifact, if one was recorded.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<ManifestEntry> {
        self.manifest.get(name).map(|e| e.value().clone())
    }

    /// Returns all manifest entries sorted by path.
    #[must_use]
    pub fn entries(&self) -> Vec<ManifestEntry> {
        let mut entries: Vec<ManifestEntry> =
            self.manifest.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    fn persist_manifest(&self) -> Result<(), StoreError> {
        let snapshot: BTreeMap<String, ManifestEntry> = self
            .manifest
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let path = self.path_of(layout::MANIFEST);
        let bytes =
            serde_json::to_vec_pretty(&snapshot).map_err(|source| StoreError::Serialize {
                name: layout::MANIFEST.to_string(),
                source,
            })?;
        std::fs::write(&path, bytes).map_err(|source| StoreError::Write { path, source })
    }
}

/// Hex sha256 digest of a byte slice.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
