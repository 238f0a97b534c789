//! LLM provider implementations

pub mod openai;
