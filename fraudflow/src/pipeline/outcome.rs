//! Run outcomes and per-stage reports.

use crate::errors::PublishWarning;
use crate::model::EvaluationResult;
use crate::pipeline::PipelineState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How one stage of a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage ran to completion.
    Completed,
    /// Stage had nothing to do for this run.
    Skipped,
    /// Stage failed.
    Failed,
}

/// Timing and status of one executed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// The stage.
    pub stage: PipelineState,
    /// How it ended.
    pub status: StageStatus,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// The failure message, when the stage failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageReport {
    /// A completed-stage report.
    #[must_use]
    pub fn completed(stage: PipelineState, duration_ms: u64) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            duration_ms,
            error: None,
        }
    }

    /// A skipped-stage report.
    #[must_use]
    pub fn skipped(stage: PipelineState) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            duration_ms: 0,
            error: None,
        }
    }

    /// A failed-stage report.
    #[must_use]
    pub fn failed(stage: PipelineState, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            duration_ms,
            error: Some(error.into()),
        }
    }
}

/// The result of one pipeline run.
///
/// A skipped run carries the cached evaluation when one is on disk; a fresh
/// run always carries one. Warnings come only from the best-effort recording
/// and publishing stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// True when existing model artifacts satisfied the run without work.
    pub skipped: bool,
    /// The evaluation metrics, fresh or cached.
    pub evaluation: Option<EvaluationResult>,
    /// Per-stage timing and status, in execution order.
    pub reports: Vec<StageReport>,
    /// Non-fatal sink failures.
    pub warnings: Vec<PublishWarning>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl RunOutcome {
    /// True when no sink produced a warning.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
