//! Run state machine

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    /// Created, sandbox not yet acquired
    Idle,

    /// Waiting on the solver
    SolverTurn,

    /// Waiting on the executor
    ExecutorTurn,

    /// Stop condition fired
    Stopped,

    /// Aborted by an error
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Stopped | RunState::Failed)
    }

    pub fn can_transition_to(&self, to: RunState) -> bool {
        use RunState::*;
        match (self, to) {
            (Stopped | Failed, _) => false,
            (_, Stopped | Failed) => true,
            (Idle, SolverTurn) => true,
            // A solver message without code goes straight back to the solver
            (SolverTurn, SolverTurn | ExecutorTurn) => true,
            (ExecutorTurn, SolverTurn) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "Idle"),
            RunState::SolverTurn => write!(f, "SolverTurn"),
            RunState::ExecutorTurn => write!(f, "ExecutorTurn"),
            RunState::Stopped => write!(f, "Stopped"),
            RunState::Failed => write!(f, "Failed"),
        }
    }
}

/// Tracks the current state and rejects illegal transitions
#[derive(Debug)]
pub struct StateTracker {
    run_id: String,
    state: RunState,
}

impl StateTracker {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            state: RunState::Idle,
        }
    }

    pub fn current(&self) -> RunState {
        self.state
    }

    pub fn transition(&mut self, to: RunState) -> Result<(), AgentError> {
        if !self.state.can_transition_to(to) {
            return Err(AgentError::InvalidState {
                from: self.state,
                to,
            });
        }
        debug!(run_id = %self.run_id, from = %self.state, to = %to, "state transition");
        self.state = to;
        Ok(())
    }
}
