//! Provider-specific error types
//!
//! Converts into `genie_foundation::Error` at the crate boundary.

use crate::retry::{RetryClassification, RetryableError};
use genie_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors that can occur while talking to an LLM endpoint
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// API key is missing or rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// Prompt (history) no longer fits the model
    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    /// Content was filtered
    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    /// Server error (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Connection failed, DNS, TLS, client timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid request (bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response body did not match the expected schema
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not found or not enabled for the key
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Billing quota exhausted
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Provider not configured (no key, bad URL)
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RetryableError for ProviderError {
    fn classify(&self) -> RetryClassification {
        match self {
            ProviderError::RateLimited { retry_after_ms } => RetryClassification::RateLimited {
                retry_after_ms: *retry_after_ms,
            },
            ProviderError::ServerError(_) | ProviderError::Network(_) => {
                RetryClassification::Retry
            }
            ProviderError::Authentication(_)
            | ProviderError::ContextLengthExceeded(_)
            | ProviderError::ContentFiltered(_)
            | ProviderError::InvalidRequest(_)
            | ProviderError::InvalidResponse(_)
            | ProviderError::ModelNotFound(_)
            | ProviderError::QuotaExceeded(_)
            | ProviderError::NotConfigured(_)
            | ProviderError::Unknown(_) => RetryClassification::NoRetry,
        }
    }
}

impl ProviderError {
    /// Map an HTTP status and body to an error
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(body.to_string()),
            429 => ProviderError::RateLimited {
                retry_after_ms: extract_retry_after(body),
            },
            400 if body.contains("context") || body.contains("too long") => {
                ProviderError::ContextLengthExceeded(body.to_string())
            }
            400 | 422 => ProviderError::InvalidRequest(body.to_string()),
            404 => ProviderError::ModelNotFound(body.to_string()),
            500..=599 => ProviderError::ServerError(body.to_string()),
            _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
        }
    }
}

/// `error.retry_after` (seconds) from a JSON body, in milliseconds
fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    let secs = json.get("error")?.get("retry_after")?.as_f64()?;
    Some((secs * 1000.0) as u64)
}

// ============================================================================
// genie_foundation::Error conversion
// ============================================================================

impl From<ProviderError> for FoundationError {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        match err {
            ProviderError::RateLimited { .. } | ProviderError::QuotaExceeded(_) => {
                FoundationError::RateLimited(message)
            }
            ProviderError::Network(msg) => FoundationError::Http(msg),
            ProviderError::NotConfigured(msg) => FoundationError::Config(msg),
            ProviderError::InvalidRequest(msg) => FoundationError::InvalidInput(msg),
            ProviderError::Authentication(_)
            | ProviderError::ContextLengthExceeded(_)
            | ProviderError::ContentFiltered(_)
            | ProviderError::ServerError(_)
            | ProviderError::ModelNotFound(_) => FoundationError::api("openai", message),
            ProviderError::InvalidResponse(_) | ProviderError::Unknown(_) => {
                FoundationError::Provider(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert!(matches!(
            ProviderError::from_http_status(401, "bad key"),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(400, "maximum context length is 8192 tokens"),
            ProviderError::ContextLengthExceeded(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(400, "bad temperature"),
            ProviderError::InvalidRequest(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(503, "overloaded"),
            ProviderError::ServerError(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(418, "teapot"),
            ProviderError::Unknown(_)
        ));
    }

    #[test]
    fn test_rate_limit_retry_after() {
        let body = r#"{"error": {"message": "slow down", "retry_after": 1.5}}"#;
        match ProviderError::from_http_status(429, body) {
            ProviderError::RateLimited { retry_after_ms } => {
                assert_eq!(retry_after_ms, Some(1500))
            }
            other => panic!("unexpected: {other:?}"),
        }

        match ProviderError::from_http_status(429, "plain text") {
            ProviderError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, None),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_retry_classification() {
        assert_eq!(
            ProviderError::Network("reset".into()).classify(),
            RetryClassification::Retry
        );
        assert_eq!(
            ProviderError::Authentication("nope".into()).classify(),
            RetryClassification::NoRetry
        );
    }

    #[test]
    fn test_into_foundation_error() {
        let err: FoundationError = ProviderError::NotConfigured("api key".into()).into();
        assert!(matches!(err, FoundationError::Config(_)));

        let err: FoundationError = ProviderError::Network("dns".into()).into();
        assert!(err.is_retryable());
    }
}
