//! OpenAI-compatible chat completion provider
//!
//! Works against api.openai.com and any endpoint speaking the same
//! `/v1/chat/completions` dialect (Azure, Ollama, LocalAI, vLLM).

use crate::{
    error::ProviderError,
    r#trait::{FinishReason, ModelInfo, Provider, ProviderMetadata, ProviderResponse, TokenUsage},
    Message, MessageRole,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// OpenAI provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model_info: ModelInfo,
    metadata: ProviderMetadata,
    max_tokens: u32,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Result<Self, ProviderError> {
        let model_id = model.into();
        let model_info = Self::get_model_info(&model_id);

        Ok(Self {
            client: Self::build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_key: api_key.into(),
            model_info,
            metadata: Self::create_metadata(&model_id),
            max_tokens,
            base_url: DEFAULT_API_URL.to_string(),
        })
    }

    /// Use a custom endpoint (OpenAI-compatible APIs)
    ///
    /// Accepts either an API root such as `http://localhost:11434/v1` or the
    /// full `/chat/completions` URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = completions_url(&base_url.into());
        self.metadata.base_url = Some(self.base_url.clone());
        self
    }

    /// Set custom request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ProviderError> {
        self.client = Self::build_client(timeout)?;
        Ok(self)
    }

    fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
        Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))
    }

    fn create_metadata(default_model: &str) -> ProviderMetadata {
        ProviderMetadata {
            id: "openai".to_string(),
            display_name: "OpenAI".to_string(),
            default_model: default_model.to_string(),
            base_url: Some(DEFAULT_API_URL.to_string()),
        }
    }

    fn get_model_info(model_id: &str) -> ModelInfo {
        let (display_name, context_window, max_output_tokens) = match model_id {
            "gpt-4o" => ("GPT-4o", 128000, 16384),
            "gpt-4o-mini" => ("GPT-4o Mini", 128000, 16384),
            "gpt-4-turbo" | "gpt-4-turbo-preview" => ("GPT-4 Turbo", 128000, 4096),
            "gpt-3.5-turbo" => ("GPT-3.5 Turbo", 16385, 4096),
            _ => return ModelInfo::new(model_id, "openai"),
        };

        ModelInfo {
            id: model_id.to_string(),
            provider: "openai".to_string(),
            display_name: display_name.to_string(),
            context_window,
            max_output_tokens,
        }
    }

    fn build_request(&self, messages: &[Message], system_prompt: Option<&str>) -> OpenAiRequest {
        let mut api_messages: Vec<OpenAiMessage> = vec![];

        if let Some(system) = system_prompt {
            api_messages.push(OpenAiMessage {
                role: MessageRole::System.as_str().to_string(),
                content: Some(system.to_string()),
                name: None,
            });
        }

        api_messages.extend(
            messages
                .iter()
                .filter(|msg| msg.role != MessageRole::System)
                .map(OpenAiMessage::from),
        );

        OpenAiRequest {
            model: self.model_info.id.clone(),
            messages: api_messages,
            max_tokens: Some(self.max_tokens.min(self.model_info.max_output_tokens)),
            stream: false,
        }
    }

    /// Parse error response from the API
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> ProviderError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            let error = error_response.error;
            let message = error.message;

            return match error.code.as_deref() {
                Some("rate_limit_exceeded") => ProviderError::RateLimited {
                    retry_after_ms: None,
                },
                Some("context_length_exceeded") => ProviderError::ContextLengthExceeded(message),
                Some("invalid_api_key") => ProviderError::Authentication(message),
                Some("insufficient_quota") => ProviderError::QuotaExceeded(message),
                Some("model_not_found") => ProviderError::ModelNotFound(message),
                Some("content_policy_violation") => ProviderError::ContentFiltered(message),
                _ => ProviderError::from_http_status(status.as_u16(), &message),
            };
        }

        ProviderError::from_http_status(status.as_u16(), body)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn model(&self) -> &ModelInfo {
        &self.model_info
    }

    async fn complete(
        &self,
        messages: Vec<Message>,
        system_prompt: Option<String>,
    ) -> Result<ProviderResponse, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::NotConfigured(
                "API key is not set (OPENAI_API_KEY)".to_string(),
            ));
        }

        let request = self.build_request(&messages, system_prompt.as_deref());
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error_response(status, &body));
        }

        let api_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        api_response.into_provider_response(&self.model_info.id)
    }

    fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
    code: Option<String>,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<&Message> for OpenAiMessage {
    fn from(msg: &Message) -> Self {
        OpenAiMessage {
            role: msg.role.as_str().to_string(),
            content: Some(msg.content.clone()),
            name: msg.name.clone(),
        }
    }
}

impl OpenAiResponse {
    fn into_provider_response(self, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        let usage = self
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            finish_reason: FinishReason::from_openai(choice.finish_reason.as_deref()),
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
        })
    }
}

const COMPLETIONS_PATH: &str = "/chat/completions";

fn completions_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.ends_with(COMPLETIONS_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, COMPLETIONS_PATH)
    }
}
