//! Pipeline state machine and orchestration.

mod orchestrator;
mod outcome;
mod state;

pub use orchestrator::{PipelineOrchestrator, RunOptions};
pub use outcome::{RunOutcome, StageReport, StageStatus};
pub use state::PipelineState;
