//! Sandbox error types

use genie_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors raised by an execution environment
///
/// Failures of the *submitted code* (non-zero exit, timeout) are not errors;
/// they come back as [`crate::ExecutionOutcome`] data.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// The isolated context could not be brought up
    #[error("Failed to start execution environment: {0}")]
    StartFailed(String),

    /// Container image missing and could not be pulled
    #[error("Image unavailable: {0}")]
    ImageUnavailable(String),

    /// Handle was used after release
    #[error("Sandbox {0} has already been released")]
    Released(String),

    /// Daemon or exec failure while the sandbox was running
    #[error("Execution environment failure: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),
}

impl SandboxError {
    /// True when the error happened while bringing the environment up
    pub fn is_start_failure(&self) -> bool {
        matches!(
            self,
            SandboxError::StartFailed(_) | SandboxError::ImageUnavailable(_)
        )
    }
}

impl From<SandboxError> for FoundationError {
    fn from(err: SandboxError) -> Self {
        if err.is_start_failure() {
            FoundationError::EnvironmentStart(err.to_string())
        } else {
            FoundationError::Sandbox(err.to_string())
        }
    }
}
