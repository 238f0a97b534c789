//! Agent error types

use crate::state::RunState;
use genie_foundation::Error as FoundationError;
use genie_provider::ProviderError;
use genie_sandbox::SandboxError;
use thiserror::Error;

/// Faults that abort a run
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidState { from: RunState, to: RunState },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AgentError> for FoundationError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Provider(e) => e.into(),
            AgentError::Sandbox(e) => e.into(),
            other => FoundationError::Agent(other.to_string()),
        }
    }
}
