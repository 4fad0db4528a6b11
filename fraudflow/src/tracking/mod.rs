//! Experiment recording and run publishing.
//!
//! All destinations implement [`RunSink`]; the orchestrator fans one
//! [`RunRecord`] out to every configured sink and folds failures into
//! warnings.

mod git;
mod mirror;
mod mlflow;
mod runlog;
mod sink;

pub use git::GitPublisher;
pub use mirror::RemoteMirrorSink;
pub use mlflow::MlflowRecorder;
pub use runlog::RunLogSink;
pub use sink::{
    CollectingRunSink, FailingRunSink, LoggingRunSink, NoOpRunSink, RunRecord, RunSink,
};
