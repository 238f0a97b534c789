//! Sandbox-backed executor participant

use crate::error::AgentError;
use crate::participant::{Participant, ParticipantReply, TurnContext};
use async_trait::async_trait;
use genie_foundation::config::DEFAULT_EXECUTOR_NAME;
use genie_sandbox::{extract_code_blocks, CodeBlock, EnvironmentManager, ExecutionResult};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Participant that runs the code blocks of the previous message
pub struct CodeExecutorAgent {
    name: String,
    manager: Arc<dyn EnvironmentManager>,
}

impl CodeExecutorAgent {
    pub fn new(manager: Arc<dyn EnvironmentManager>) -> Self {
        Self {
            name: DEFAULT_EXECUTOR_NAME.to_string(),
            manager,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Participant for CodeExecutorAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(&self, ctx: TurnContext<'_>) -> Result<ParticipantReply, AgentError> {
        let blocks = ctx
            .history
            .iter()
            .rev()
            .find(|m| !m.is_from(&self.name))
            .map(|m| extract_code_blocks(&m.content))
            .unwrap_or_default();

        if blocks.is_empty() {
            return Ok(ParticipantReply::text(
                "No code blocks found in the previous message.",
            ));
        }

        let total = blocks.len();
        let mut sections = Vec::with_capacity(total);
        for (index, block) in blocks.iter().enumerate() {
            debug!(
                turn = ctx.turn,
                block = index + 1,
                language = %block.language,
                "executing code block"
            );

            match self.manager.execute(ctx.sandbox, block).await {
                Ok(result) => {
                    info!(
                        turn = ctx.turn,
                        block = index + 1,
                        exit_code = result.exit_code,
                        "code block finished: {}",
                        result.outcome
                    );
                    sections.push(format_section(index, total, block, &result));
                }
                Err(e) => {
                    error!(turn = ctx.turn, block = index + 1, "sandbox failed: {}", e);
                    let message = e.to_string();
                    sections.push(format!("Environment failure: {}", message));
                    return Ok(ParticipantReply::text(sections.join("\n\n"))
                        .with_environment_failure(message));
                }
            }
        }

        Ok(ParticipantReply::text(sections.join("\n\n")))
    }
}

fn format_section(index: usize, total: usize, block: &CodeBlock, result: &ExecutionResult) -> String {
    let mut section = String::new();
    if total > 1 {
        section.push_str(&format!("--- block {}/{} ({}) ---\n", index + 1, total, block.language));
    }

    let output = result.output.trim_end();
    if result.is_success() {
        section.push_str(if output.is_empty() { "(no output)" } else { output });
    } else {
        section.push_str(&result.outcome.to_string());
        if !output.is_empty() {
            section.push('\n');
            section.push_str(output);
        }
    }
    section
}
