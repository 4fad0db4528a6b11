//! Error types for the fraud detection pipeline.
//!
//! Fatal errors abort the run at the stage that raised them and propagate
//! unchanged to the caller. Publish warnings never abort anything; they are
//! collected on the run outcome for manual retry.

use crate::pipeline::PipelineState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for operations returning [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;

/// The umbrella error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration could not be loaded or validated.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Source data could not be fetched or read.
    #[error("{0}")]
    Ingestion(#[from] IngestionError),

    /// The cleaned table cannot support training.
    #[error("{0}")]
    Schema(#[from] SchemaError),

    /// Model fitting failed.
    #[error("{0}")]
    Training(#[from] TrainingError),

    /// Grid search failed.
    #[error("{0}")]
    Tuning(#[from] TuningError),

    /// Scoring the held-out split failed.
    #[error("{0}")]
    Evaluation(#[from] EvaluationError),

    /// A local artifact could not be persisted or loaded.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// A mandatory stage failed; names the stage for the caller.
    #[error("{0}")]
    Stage(#[from] StageFailure),
}

/// A mandatory stage failed. Wraps the underlying error with the stage that
/// raised it so callers can report exactly where the run stopped.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {source}")]
pub struct StageFailure {
    /// The stage that raised the error.
    pub stage: PipelineState,
    /// The underlying error.
    #[source]
    pub source: Box<PipelineError>,
}

impl StageFailure {
    /// Creates a new stage failure.
    #[must_use]
    pub fn new(stage: PipelineState, source: PipelineError) -> Self {
        Self {
            stage,
            source: Box::new(source),
        }
    }
}

/// Errors raised while loading or validating the configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        /// The path that was read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("failed to parse config file '{}': {source}", path.display())]
    Parse {
        /// The path that was parsed.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// A configuration value failed validation.
    #[error("invalid config value for '{field}': {reason}")]
    Invalid {
        /// The offending field, dotted path form.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while fetching or reading source data.
///
/// Ingestion is fail-fast: a single unreadable source aborts the whole run
/// rather than training on a partial dataset.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The `[ingestion]` section is absent from the configuration.
    #[error("ingestion settings are missing from the configuration")]
    NotConfigured,

    /// The configured source file list is empty.
    #[error("ingestion source file list is empty")]
    NoSourceFiles,

    /// No remote store and no local source directory to read from.
    #[error("no remote store configured and no local source directory set")]
    NoSource,

    /// A source object could not be downloaded.
    #[error("failed to download source '{object}': {source}")]
    Download {
        /// The remote object name.
        object: String,
        /// The underlying remote error.
        #[source]
        source: RemoteStoreError,
    },

    /// A local source file could not be read.
    #[error("failed to read source '{}': {source}", path.display())]
    Read {
        /// The path that was read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A source file is not valid CSV.
    #[error("malformed source '{}': {source}", path.display())]
    Csv {
        /// The offending source path.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// A source declared the same column twice.
    #[error("source '{}' declares duplicate column '{column}'", path.display())]
    DuplicateColumn {
        /// The offending source path.
        path: PathBuf,
        /// The duplicated column name.
        column: String,
    },

    /// A source contained a header but no data rows.
    #[error("source '{}' contains no rows", path.display())]
    EmptySource {
        /// The offending source path.
        path: PathBuf,
    },

    /// A source produced an inconsistent table.
    #[error("source '{}' produced an inconsistent table: {source}", path.display())]
    Table {
        /// The offending source path.
        path: PathBuf,
        /// The underlying schema error.
        #[source]
        source: SchemaError,
    },

    /// The fetched bytes could not be persisted locally.
    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Errors raised while parsing a CSV document into a table.
#[derive(Debug, Error)]
pub enum TableParseError {
    /// The document is not valid CSV.
    #[error("{0}")]
    Csv(#[from] csv::Error),

    /// The parsed header or rows are structurally invalid.
    #[error("{0}")]
    Schema(#[from] SchemaError),
}

/// Errors raised when the data cannot support the feature/label contract.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum SchemaError {
    /// A table was constructed with a duplicate column name.
    #[error("duplicate column name '{column}'")]
    DuplicateColumn {
        /// The duplicated name.
        column: String,
    },

    /// A row did not match the table width.
    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth {
        /// Zero-based row index.
        row: usize,
        /// The table width.
        expected: usize,
        /// The actual cell count.
        found: usize,
    },

    /// Fewer than two columns remain, so no feature/label separation exists.
    #[error("table has {columns} column(s) after cleaning, need at least 2")]
    TooFewColumns {
        /// The column count after cleaning.
        columns: usize,
    },

    /// The configured label column is absent.
    #[error("label column '{column}' not found in the table")]
    LabelColumnMissing {
        /// The configured column name.
        column: String,
    },

    /// Too few complete rows remain to populate both partitions.
    #[error("only {rows} complete row(s) remain, cannot fill both train and test splits")]
    TooFewRows {
        /// The row count after cleaning.
        rows: usize,
    },

    /// A record supplied a feature the schema does not know.
    #[error("unknown feature '{feature}'")]
    UnknownFeature {
        /// The unexpected feature name.
        feature: String,
    },

    /// A record omitted a feature the schema requires.
    #[error("missing feature '{feature}'")]
    MissingFeature {
        /// The absent feature name.
        feature: String,
    },

    /// A record listed features in the wrong order.
    #[error("feature at position {position} is '{found}', expected '{expected}'")]
    FeatureOrder {
        /// Zero-based feature position.
        position: usize,
        /// The schema's feature at that position.
        expected: String,
        /// The supplied feature.
        found: String,
    },

    /// A feature row has the wrong number of values.
    #[error("expected {expected} feature value(s), got {found}")]
    WrongArity {
        /// The schema's feature count.
        expected: usize,
        /// The supplied value count.
        found: usize,
    },
}

/// Errors raised while fitting the model.
///
/// Non-convergence within the iteration budget is not an error; it is
/// logged and flagged on the persisted model instead.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// The training split is empty.
    #[error("training set is empty")]
    EmptyTrainingSet,

    /// Features and labels disagree in length.
    #[error("feature matrix has {rows} row(s) but label vector has {labels}")]
    DimensionMismatch {
        /// Feature row count.
        rows: usize,
        /// Label count.
        labels: usize,
    },

    /// The objective or gradient became non-finite.
    #[error("optimization produced a non-finite value at iteration {iteration}")]
    NonFinite {
        /// The iteration at which the value degenerated.
        iteration: usize,
    },

    /// The fitted model could not be persisted.
    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Errors raised during grid search.
#[derive(Debug, Error)]
pub enum TuningError {
    /// Fewer rows than cross-validation folds.
    #[error("cannot run {folds}-fold cross-validation on {rows} row(s)")]
    TooFewRows {
        /// Training row count.
        rows: usize,
        /// The configured fold count.
        folds: usize,
    },

    /// The worker pool could not be built.
    #[error("failed to build tuning worker pool: {reason}")]
    Pool {
        /// The pool builder's message.
        reason: String,
    },

    /// A candidate failed to fit.
    #[error("candidate (C={c}, solver={solver}) failed: {source}")]
    Candidate {
        /// The candidate's regularization strength.
        c: f64,
        /// The candidate's solver name.
        solver: String,
        /// The underlying training error.
        #[source]
        source: TrainingError,
    },

    /// The winning model could not be persisted.
    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Errors raised while scoring the held-out split.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The test split is empty.
    #[error("test set is empty, nothing to evaluate")]
    EmptyTestSet,

    /// Features and labels disagree in length.
    #[error("test matrix has {rows} row(s) but label vector has {labels}")]
    DimensionMismatch {
        /// Feature row count.
        rows: usize,
        /// Label count.
        labels: usize,
    },

    /// A report artifact could not be persisted.
    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Errors raised by the local artifact store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A store directory could not be created.
    #[error("failed to create artifact directory '{}': {source}", path.display())]
    CreateDir {
        /// The directory path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be written.
    #[error("failed to write artifact '{}': {source}", path.display())]
    Write {
        /// The artifact path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be read.
    #[error("failed to read artifact '{}': {source}", path.display())]
    Read {
        /// The artifact path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An expected artifact is absent.
    #[error("artifact '{}' does not exist", path.display())]
    Missing {
        /// The absent path.
        path: PathBuf,
    },

    /// An artifact could not be serialized.
    #[error("failed to serialize artifact '{name}': {source}")]
    Serialize {
        /// The artifact name.
        name: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// An artifact could not be deserialized.
    #[error("failed to deserialize artifact '{}': {source}", path.display())]
    Deserialize {
        /// The artifact path.
        path: PathBuf,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by a remote object store.
#[derive(Debug, Error)]
pub enum RemoteStoreError {
    /// The HTTP client could not be constructed or the request failed.
    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a non-success status.
    #[error("remote returned status {status} for object '{object}'")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The object the request addressed.
        object: String,
    },

    /// The remote is not configured for this operation.
    #[error("remote store misconfigured: {reason}")]
    Misconfigured {
        /// Why the store cannot serve the operation.
        reason: String,
    },
}

/// Errors raised while serving predictions from persisted artifacts.
#[derive(Debug, Error)]
pub enum ServeError {
    /// A model artifact required for inference is absent.
    #[error("model artifact '{}' does not exist, run training first", path.display())]
    MissingArtifact {
        /// The absent artifact path.
        path: PathBuf,
    },

    /// An artifact could not be loaded.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The supplied record does not match the feature schema.
    #[error("{0}")]
    Schema(#[from] SchemaError),
}

/// A non-fatal failure from a recording or publishing sink.
///
/// Warnings are logged with the sink that produced them and surfaced on the
/// run outcome; they never change control flow.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("sink '{sink}' failed: {message}")]
pub struct PublishWarning {
    /// The sink that failed.
    pub sink: String,
    /// What went wrong.
    pub message: String,
}

impl PublishWarning {
    /// Creates a new publish warning.
    #[must_use]
    pub fn new(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            message: message.into(),
        }
    }
}
