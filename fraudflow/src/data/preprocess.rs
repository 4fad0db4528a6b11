//! Data preprocessing.
//!
//! Turns the raw concatenated table into scaled train/test matrices plus the
//! two artifacts every consumer shares: the fitted scaler and the ordered
//! feature schema. Every step is reproducible bit for bit given the same
//! seed.

use crate::config::ProcessingConfig;
use crate::data::{
    encode_table, train_test_split, FeatureSchema, RawTable, SplitData, StandardScaler,
};
use crate::errors::{IngestionError, PipelineError, SchemaError, TableParseError};
use crate::store::{layout, mirror_artifact, ArtifactStore, RemoteStore};
use std::sync::Arc;
use tracing::info;

/// Everything preprocessing hands to the downstream stages.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    /// Scaled train/test matrices and labels.
    pub split: SplitData,
    /// Standardizer fitted on the training split only.
    pub scaler: StandardScaler,
    /// Ordered feature schema.
    pub schema: FeatureSchema,
}

/// Cleans, encodes, splits, and scales the raw table.
pub struct DataProcessor {
    config: ProcessingConfig,
    store: Arc<ArtifactStore>,
    remote: Option<Arc<dyn RemoteStore>>,
}

impl DataProcessor {
    /// Creates a processor.
    #[must_use]
    pub fn new(
        config: ProcessingConfig,
        store: Arc<ArtifactStore>,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Self {
        Self {
            config,
            store,
            remote,
        }
    }

    /// Preprocesses a table into train/test matrices.
    ///
    /// When `table` is `None` the persisted combined raw CSV is loaded
    /// instead, so preprocessing can rerun without refetching sources.
    ///
    /// Steps, in order: drop rows with any missing value, label-encode
    /// non-numeric columns, separate the label column, seeded shuffle split,
    /// standardize with train-only statistics, persist the three
    /// preprocessing artifacts.
    pub async fn preprocess(
        &self,
        table: Option<RawTable>,
    ) -> Result<PreparedData, PipelineError> {
        let table = match table {
            Some(table) => table,
            None => self.load_combined()?,
        };

        let (clean, dropped) = table.drop_missing();
        info!(dropped, remaining = clean.n_rows(), "dropped incomplete rows");

        if clean.n_cols() < 2 {
            return Err(SchemaError::TooFewColumns {
                columns: clean.n_cols(),
            }
            .into());
        }

        let encoded = encode_table(&clean).map_err(PipelineError::Schema)?;
        let encoded_columns = encoded.encoded_columns();
        if !encoded_columns.is_empty() {
            info!(columns = ?encoded_columns, "label encoded categorical columns");
        }

        let label_idx = match &self.config.label_column {
            Some(name) => clean
                .column_index(name)
                .ok_or_else(|| SchemaError::LabelColumnMissing {
                    column: name.clone(),
                })?,
            None => clean.n_cols() - 1,
        };

        let feature_names: Vec<String> = encoded
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != label_idx)
            .map(|(_, name)| name.clone())
            .collect();
        let schema = FeatureSchema::new(feature_names);

        let features: Vec<Vec<f64>> = encoded
            .matrix
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(i, _)| *i != label_idx)
                    .map(|(_, value)| *value)
                    .collect()
            })
            .collect();
        let labels: Vec<f64> = encoded.matrix.iter().map(|row| row[label_idx]).collect();

        let unscaled = train_test_split(
            &features,
            &labels,
            self.config.test_fraction,
            self.config.seed,
        )?;

        let scaler = StandardScaler::fit(&unscaled.x_train);
        let split = SplitData {
            x_train: scaler.transform_matrix(&unscaled.x_train)?,
            y_train: unscaled.y_train,
            x_test: scaler.transform_matrix(&unscaled.x_test)?,
            y_test: unscaled.y_test,
        };

        self.store.put_json(layout::DATASET, &split)?;
        self.store.put_json(layout::SCALER, &scaler)?;
        self.store.put_json(layout::FEATURE_NAMES, &schema)?;

        if let Some(remote) = &self.remote {
            let bytes = self.store.get_bytes(layout::DATASET)?;
            mirror_artifact(remote.as_ref(), layout::DATASET, &bytes).await;
        }

        info!(
            train = split.n_train(),
            test = split.n_test(),
            features = schema.len(),
            "preprocessing complete"
        );

        Ok(PreparedData {
            split,
            scaler,
            schema,
        })
    }

    fn load_combined(&self) -> Result<RawTable, PipelineError> {
        let bytes = self.store.get_bytes(layout::COMBINED_RAW)?;
        RawTable::from_csv_reader(bytes.as_slice()).map_err(|error| match error {
            TableParseError::Csv(source) => PipelineError::Ingestion(IngestionError::Csv {
                path: self.store.path_of(layout::COMBINED_RAW),
                source,
            }),
            TableParseError::Schema(source) => PipelineError::Schema(source),
        })
    }
}
