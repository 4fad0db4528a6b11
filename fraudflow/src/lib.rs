//! # Fraudflow
//!
//! A fraud-detection training pipeline: ingest transaction CSVs, clean and
//! encode them, train and tune a logistic-regression classifier, evaluate
//! it, and record the run to pluggable tracking sinks.
//!
//! The pipeline is a fixed sequence of stages:
//!
//! - **Ingesting**: fetch and concatenate the configured raw sources
//! - **Processing**: drop incomplete rows, encode, split, scale
//! - **Training**: fit the baseline model
//! - **Tuning**: cross-validated grid search, refit the winner
//! - **Evaluating**: score the held-out split and persist the reports
//! - **Recording / Publishing**: best-effort delivery to tracking sinks
//!
//! The first five stages are mandatory and abort the run on failure; the
//! last two degrade to warnings on the run outcome.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fraudflow::prelude::*;
//!
//! let config = PipelineConfig::from_file("config/fraudflow.toml")?;
//! let orchestrator = PipelineOrchestrator::from_config(config)?;
//! let outcome = orchestrator.run(RunOptions::default()).await?;
//! println!("accuracy: {:?}", outcome.evaluation.map(|e| e.accuracy));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

pub mod config;
pub mod data;
pub mod errors;
pub mod model;
pub mod pipeline;
pub mod serve;
pub mod store;
pub mod testing;
pub mod tracking;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        IngestionConfig, PipelineConfig, ProcessingConfig, PublishConfig,
        RemoteConfig, TrackingConfig,
    };
    pub use crate::data::{
        DataIngestor, DataProcessor, FeatureSchema, PreparedData, RawTable,
        SplitData, StandardScaler,
    };
    pub use crate::errors::{
        ConfigError, EvaluationError, IngestionError, PipelineError,
        PublishWarning, SchemaError, ServeError, StageFailure, StoreError,
        TrainingError, TuningError,
    };
    pub use crate::model::{
        BinaryEstimator, EvaluationResult, Evaluator, HyperParams,
        LogisticModel, ModelTrainer, Solver, Tuner,
    };
    pub use crate::pipeline::{
        PipelineOrchestrator, PipelineState, RunOptions, RunOutcome,
        StageReport, StageStatus,
    };
    pub use crate::serve::{FeatureRecord, InferenceContext, Prediction};
    pub use crate::store::{ArtifactStore, HttpObjectStore, RemoteStore};
    pub use crate::tracking::{
        LoggingRunSink, NoOpRunSink, RunRecord, RunSink,
    };
}
