//! LLM-backed solver participant

use crate::error::AgentError;
use crate::message::{ChatMessage, USER_SOURCE};
use crate::participant::{Participant, ParticipantReply, TurnContext};
use async_trait::async_trait;
use genie_foundation::config::{DEFAULT_SOLVER_NAME, DEFAULT_TERMINATION_PHRASE};
use genie_provider::{with_retry, Message, Provider, RetryConfig};
use std::sync::Arc;
use tracing::{debug, info};

/// System prompt with `{phrase}` standing in for the termination phrase
const SYSTEM_PROMPT_TEMPLATE: &str = "\
You are a problem solver agent that is an expert in solving data structures and algorithms problems.
You work with a code executor agent that runs the code you write.

For each problem:
1. Explain your approach briefly.
2. Write a complete, self-contained solution in a single ```python code block, including a few test cases that print their results.
3. Wait for the code executor to run it and report the output.
4. If the output shows an error or wrong answer, fix the code and send the full corrected version.

Only use the Python standard library. Never ask the user for input.
Once the code has run successfully and the results are correct, explain the solution and its time and space complexity, then end your message with {phrase}.";

/// Render the default system prompt for a termination phrase
pub fn default_system_prompt(phrase: &str) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{phrase}", phrase)
}

/// Participant that asks a chat-completion model for the next message
pub struct SolverAgent {
    name: String,
    provider: Arc<dyn Provider>,
    system_prompt: String,
    retry: RetryConfig,
}

impl SolverAgent {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            name: DEFAULT_SOLVER_NAME.to_string(),
            provider,
            system_prompt: default_system_prompt(DEFAULT_TERMINATION_PHRASE),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Map the run history onto provider messages
    ///
    /// Own messages become assistant turns; everything else is a user turn,
    /// prefixed with its source unless it is the task itself.
    pub fn build_messages(&self, history: &[ChatMessage]) -> Vec<Message> {
        history
            .iter()
            .map(|m| {
                if m.is_from(&self.name) {
                    Message::assistant(&m.content)
                } else if m.is_from(USER_SOURCE) {
                    Message::user(&m.content)
                } else {
                    Message::user(format!("{}:\n{}", m.source, m.content))
                }
            })
            .collect()
    }
}

#[async_trait]
impl Participant for SolverAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(&self, ctx: TurnContext<'_>) -> Result<ParticipantReply, AgentError> {
        let messages = self.build_messages(ctx.history);
        debug!(
            turn = ctx.turn,
            messages = messages.len(),
            estimated_tokens = self.provider.estimate_tokens(&messages, Some(self.system_prompt.as_str())),
            "solver request"
        );

        let response = with_retry(&self.retry, "solver completion", || {
            self.provider
                .complete(messages.clone(), Some(self.system_prompt.clone()))
        })
        .await?;

        info!(
            turn = ctx.turn,
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "solver replied"
        );
        Ok(ParticipantReply::text(response.content))
    }
}
