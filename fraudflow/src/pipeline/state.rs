//! Pipeline run states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The states of one pipeline run, in execution order.
///
/// Ingesting through Evaluating are mandatory: a failure there moves the
/// machine to [`PipelineState::Failed`] and aborts the run. Recording and
/// Publishing are best-effort and can only produce warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No run in progress.
    Idle,
    /// Fetching and concatenating raw sources.
    Ingesting,
    /// Cleaning, encoding, splitting, and scaling the table.
    Processing,
    /// Fitting the baseline model.
    Training,
    /// Searching the hyperparameter grid.
    Tuning,
    /// Scoring the held-out split.
    Evaluating,
    /// Sending the run to the experiment trackers.
    Recording,
    /// Mirroring artifacts and pushing the run log.
    Publishing,
    /// Run finished.
    Done,
    /// A mandatory stage failed.
    Failed,
}

impl PipelineState {
    /// The state entered when this one succeeds. Terminal states return
    /// themselves.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::Ingesting,
            Self::Ingesting => Self::Processing,
            Self::Processing => Self::Training,
            Self::Training => Self::Tuning,
            Self::Tuning => Self::Evaluating,
            Self::Evaluating => Self::Recording,
            Self::Recording => Self::Publishing,
            Self::Publishing => Self::Done,
            Self::Done => Self::Done,
            Self::Failed => Self::Failed,
        }
    }

    /// Whether a failure in this state aborts the run.
    #[must_use]
    pub fn is_mandatory(self) -> bool {
        matches!(
            self,
            Self::Ingesting | Self::Processing | Self::Training | Self::Tuning | Self::Evaluating
        )
    }

    /// Whether the machine stops here.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Lowercase state name for logs and error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ingesting => "ingesting",
            Self::Processing => "processing",
            Self::Training => "training",
            Self::Tuning => "tuning",
            Self::Evaluating => "evaluating",
            Self::Recording => "recording",
            Self::Publishing => "publishing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_walks_every_stage() {
        let mut state = PipelineState::Idle;
        let mut visited = vec![state];
        while !state.is_terminal() {
            state = state.next();
            visited.push(state);
        }

        assert_eq!(
            visited,
            vec![
                PipelineState::Idle,
                PipelineState::Ingesting,
                PipelineState::Processing,
                PipelineState::Training,
                PipelineState::Tuning,
                PipelineState::Evaluating,
                PipelineState::Recording,
                PipelineState::Publishing,
                PipelineState::Done,
            ]
        );
    }

    #[test]
    fn test_mandatory_stages() {
        assert!(PipelineState::Ingesting.is_mandatory());
        assert!(PipelineState::Evaluating.is_mandatory());
        assert!(!PipelineState::Recording.is_mandatory());
        assert!(!PipelineState::Publishing.is_mandatory());
        assert!(!PipelineState::Idle.is_mandatory());
    }

    #[test]
    fn test_terminal_states_absorb() {
        assert_eq!(PipelineState::Done.next(), PipelineState::Done);
        assert_eq!(PipelineState::Failed.next(), PipelineState::Failed);
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(PipelineState::Processing.to_string(), "processing");
        assert_eq!(PipelineState::Evaluating.to_string(), "evaluating");
    }
}
