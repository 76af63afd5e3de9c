use std::fmt;

use crate::errors::ExecutionError;

/// Lifecycle of one step within one run.
///
/// ```text
/// Pending -> Ready -> Running -> Done
///                            \-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepState {
    /// Waiting for upstream producers.
    Pending,
    /// All upstream producers are done; queued for a worker.
    Ready,
    Running,
    Done,
    Failed,
}

impl StepState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepState::Done | StepState::Failed)
    }

    pub fn can_advance_to(self, next: StepState) -> bool {
        matches!(
            (self, next),
            (StepState::Pending, StepState::Ready)
                | (StepState::Ready, StepState::Running)
                | (StepState::Running, StepState::Done)
                | (StepState::Running, StepState::Failed)
        )
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepState::Pending => "pending",
            StepState::Ready => "ready",
            StepState::Running => "running",
            StepState::Done => "done",
            StepState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-run table of step states that rejects illegal transitions.
#[derive(Debug)]
pub(crate) struct StepStates {
    states: Vec<StepState>,
}

impl StepStates {
    pub(crate) fn new(step_count: usize) -> Self {
        Self {
            states: vec![StepState::Pending; step_count],
        }
    }

    pub(crate) fn get(&self, index: usize) -> StepState {
        self.states[index]
    }

    pub(crate) fn advance(&mut self, index: usize, next: StepState) -> Result<(), ExecutionError> {
        let current = self.states[index];
        if !current.can_advance_to(next) {
            return Err(ExecutionError::Internal {
                message: format!("step #{} cannot move from {} to {}", index, current, next),
            });
        }
        self.states[index] = next;
        Ok(())
    }

    pub(crate) fn count(&self, state: StepState) -> usize {
        self.states.iter().filter(|&&s| s == state).count()
    }
}
