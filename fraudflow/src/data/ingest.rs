//! Data ingestion.
//!
//! Fetches the configured source files, lands a copy of each under the
//! store's `raw/` directory, and concatenates them in configured order.
//! Ingestion is fail-fast: one unreadable source aborts the run, partial
//! datasets are never handed downstream.

use crate::config::{IngestionConfig, PipelineConfig};
use crate::data::RawTable;
use crate::errors::{IngestionError, SchemaError, TableParseError};
use crate::store::{layout, ArtifactStore, RemoteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Fetches and concatenates the configured raw sources.
pub struct DataIngestor {
    config: IngestionConfig,
    store: Arc<ArtifactStore>,
    remote: Option<Arc<dyn RemoteStore>>,
}

impl std::fmt::Debug for DataIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataIngestor").finish_non_exhaustive()
    }
}

impl DataIngestor {
    /// Builds an ingestor from the pipeline configuration.
    ///
    /// Missing or empty ingestion settings fail here, before any stage runs.
    pub fn from_config(
        config: &PipelineConfig,
        store: Arc<ArtifactStore>,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Result<Self, IngestionError> {
        let ingestion = config
            .ingestion
            .clone()
            .ok_or(IngestionError::NotConfigured)?;

        if ingestion.source_files.is_empty() {
            return Err(IngestionError::NoSourceFiles);
        }
        if remote.is_none() && ingestion.local_source_dir.is_none() {
            return Err(IngestionError::NoSource);
        }

        Ok(Self {
            config: ingestion,
            store,
            remote,
        })
    }

    /// Fetches every source and returns the concatenated table unmodified.
    ///
    /// The combined table is also persisted as `raw/combined.csv` so
    /// preprocessing can rerun without refetching.
    pub async fn run(&self) -> Result<RawTable, IngestionError> {
        let mut tables = Vec::with_capacity(self.config.source_files.len());

        for file in &self.config.source_files {
            let table = if let Some(remote) = &self.remote {
                self.fetch_remote(remote.as_ref(), file).await?
            } else {
                self.read_local(file)?
            };

            if table.n_rows() == 0 {
                return Err(IngestionError::EmptySource {
                    path: PathBuf::from(file),
                });
            }

            info!(source = %file, rows = table.n_rows(), columns = table.n_cols(), "ingested source");
            tables.push(table);
        }

        let combined = RawTable::concat(tables).map_err(|source| IngestionError::Table {
            path: PathBuf::from(layout::COMBINED_RAW),
            source,
        })?;

        let bytes = combined.to_csv_bytes().map_err(|source| IngestionError::Csv {
            path: PathBuf::from(layout::COMBINED_RAW),
            source,
        })?;
        self.store.put_bytes(layout::COMBINED_RAW, &bytes)?;

        info!(
            rows = combined.n_rows(),
            sources = self.config.source_files.len(),
            "ingestion complete"
        );
        Ok(combined)
    }

    async fn fetch_remote(
        &self,
        remote: &dyn RemoteStore,
        file: &str,
    ) -> Result<RawTable, IngestionError> {
        let object = format!("{}/{}", self.config.source_location, file);
        let bytes =
            remote
                .download(&object)
                .await
                .map_err(|source| IngestionError::Download {
                    object: object.clone(),
                    source,
                })?;

        let local_name = format!("{}/{}", layout::RAW_DIR, file);
        self.store.put_bytes(&local_name, &bytes)?;

        parse_table(&bytes, &self.store.path_of(&local_name))
    }

    fn read_local(&self, file: &str) -> Result<RawTable, IngestionError> {
        let Some(dir) = &self.config.local_source_dir else {
            return Err(IngestionError::NoSource);
        };

        let path = dir.join(file);
        let bytes = std::fs::read(&path).map_err(|source| IngestionError::Read {
            path: path.clone(),
            source,
        })?;
        self.store
            .put_bytes(&format!("{}/{}", layout::RAW_DIR, file), &bytes)?;

        parse_table(&bytes, &path)
    }
}

fn parse_table(bytes: &[u8], path: &Path) -> Result<RawTable, IngestionError> {
    RawTable::from_csv_reader(bytes).map_err(|error| match error {
        TableParseError::Csv(source) => IngestionError::Csv {
            path: path.to_path_buf(),
            source,
        },
        TableParseError::Schema(SchemaError::DuplicateColumn { column }) => {
            IngestionError::DuplicateColumn {
                path: path.to_path_buf(),
                column,
            }
        }
        TableParseError::Schema(source) => IngestionError::Table {
            path: path.to_path_buf(),
            source,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use crate::store::MockRemoteStore;
    use mockall::predicate::eq;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir, files: &[&str]) -> PipelineConfig {
        PipelineConfig {
            ingestion: Some(IngestionConfig {
                source_location: "fraud-transactions".to_string(),
                source_files: files.iter().map(|f| (*f).to_string()).collect(),
                local_source_dir: Some(dir.path().join("sources")),
            }),
            processing: ProcessingConfig::default(),
            ..PipelineConfig::default()
        }
    }

    fn write_source(dir: &TempDir, name: &str, content: &str) {
        let sources = dir.path().join("sources");
        std::fs::create_dir_all(&sources).unwrap();
        std::fs::write(sources.join(name), content).unwrap();
    }

    fn store_in(dir: &TempDir) -> Arc<ArtifactStore> {
        Arc::new(ArtifactStore::open(dir.path().join("artifacts")).unwrap())
    }

    #[tokio::test]
    async fn test_concat_preserves_all_rows() {
        let dir = TempDir::new().unwrap();
        write_source(&dir, "a.csv", "amount,fraud\n1,0\n2,0\n3,1\n");
        write_source(&dir, "b.csv", "amount,fraud\n4,0\n5,1\n");

        let store = store_in(&dir);
        let ingestor =
            DataIngestor::from_config(&config_for(&dir, &["a.csv", "b.csv"]), store.clone(), None)
                .unwrap();

        let table = ingestor.run().await.unwrap();
        assert_eq!(table.n_rows(), 5);
        assert!(store.exists(layout::COMBINED_RAW));
        assert!(store.exists("raw/a.csv"));
    }

    #[tokio::test]
    async fn test_missing_source_fails_fast() {
        let dir = TempDir::new().unwrap();
        write_source(&dir, "a.csv", "amount,fraud\n1,0\n");

        let store = store_in(&dir);
        let ingestor = DataIngestor::from_config(
            &config_for(&dir, &["a.csv", "missing.csv"]),
            store.clone(),
            None,
        )
        .unwrap();

        let err = ingestor.run().await.unwrap_err();
        assert!(matches!(err, IngestionError::Read { .. }));
        assert!(!store.exists(layout::COMBINED_RAW));
    }

    #[tokio::test]
    async fn test_empty_source_rejected() {
        let dir = TempDir::new().unwrap();
        write_source(&dir, "a.csv", "amount,fraud\n");

        let store = store_in(&dir);
        let ingestor =
            DataIngestor::from_config(&config_for(&dir, &["a.csv"]), store, None).unwrap();

        let err = ingestor.run().await.unwrap_err();
        assert!(matches!(err, IngestionError::EmptySource { .. }));
    }

    #[tokio::test]
    async fn test_remote_download_lands_in_raw() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut remote = MockRemoteStore::new();
        remote
            .expect_download()
            .with(eq("fraud-transactions/a.csv"))
            .times(1)
            .returning(|_| Ok(b"amount,fraud\n9,1\n".to_vec()));

        let ingestor = DataIngestor::from_config(
            &config_for(&dir, &["a.csv"]),
            store.clone(),
            Some(Arc::new(remote)),
        )
        .unwrap();

        let table = ingestor.run().await.unwrap();
        assert_eq!(table.n_rows(), 1);
        assert!(store.exists("raw/a.csv"));
    }

    #[tokio::test]
    async fn test_remote_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut remote = MockRemoteStore::new();
        remote.expect_download().returning(|object| {
            Err(crate::errors::RemoteStoreError::Status {
                status: 404,
                object: object.to_string(),
            })
        });

        let ingestor =
            DataIngestor::from_config(&config_for(&dir, &["a.csv"]), store, Some(Arc::new(remote)))
                .unwrap();

        let err = ingestor.run().await.unwrap_err();
        assert!(matches!(err, IngestionError::Download { .. }));
    }

    #[test]
    fn test_construction_requires_ingestion_section() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let err = DataIngestor::from_config(&PipelineConfig::default(), store, None).unwrap_err();
        assert!(matches!(err, IngestionError::NotConfigured));
    }

    #[test]
    fn test_construction_requires_a_source() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut config = config_for(&dir, &["a.csv"]);
        if let Some(ingestion) = config.ingestion.as_mut() {
            ingestion.local_source_dir = None;
        }

        let err = DataIngestor::from_config(&config, store, None).unwrap_err();
        assert!(matches!(err, IngestionError::NoSource));
    }
}
