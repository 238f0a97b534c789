//! # genie-provider
//!
//! LLM provider abstraction layer for AlgoGenie.
//!
//! ## Features
//! - One `Provider` trait the solver talks to
//! - OpenAI-compatible chat completions (OpenAI, Azure, Ollama, vLLM)
//! - Automatic retry with exponential backoff

pub mod error;
pub mod message;
pub mod providers;
pub mod retry;
pub mod r#trait;

// Core traits and types
pub use message::{Message, MessageRole};
pub use r#trait::{
    FinishReason, ModelInfo, Provider, ProviderMetadata, ProviderResponse, TokenUsage,
};

// Error and retry
pub use error::ProviderError;
pub use retry::{with_retry, RetryClassification, RetryConfig, RetryableError};

// Provider implementations
pub use providers::openai::OpenAiProvider;
