//! Error types for AlgoGenie
//!
//! Every layer keeps its own detailed error enum and converts into this one at
//! the crate boundary.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// AlgoGenie error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Execution environment
    // ========================================================================
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Environment failed to start: {0}")]
    EnvironmentStart(String),

    // ========================================================================
    // Provider / Agent
    // ========================================================================
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("API error: {provider} - {message}")]
    Api { provider: String, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Agent error: {0}")]
    Agent(String),

    // ========================================================================
    // Presentation
    // ========================================================================
    #[error("Render error: {0}")]
    Render(String),

    // ========================================================================
    // General
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same operation might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited(_) | Error::Http(_))
    }

    /// Whether the message is meant to be shown to the end user as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::EnvironmentStart(_))
    }

    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::RateLimited("429".into()).is_retryable());
        assert!(Error::Http("reset".into()).is_retryable());
        assert!(!Error::Config("bad".into()).is_retryable());
        assert!(!Error::EnvironmentStart("no docker".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = Error::api("openai", "invalid key");
        assert_eq!(err.to_string(), "API error: openai - invalid key");

        let err: Error = "boom".into();
        assert!(matches!(err, Error::Internal(_)));
        assert!(Error::InvalidInput("empty task".into()).is_user_facing());
    }
}
