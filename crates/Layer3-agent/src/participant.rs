//! Participant contract shared by the solver and the executor

use crate::error::AgentError;
use crate::message::ChatMessage;
use async_trait::async_trait;
use genie_sandbox::SandboxHandle;

/// What a participant sees when it is its turn
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    /// Full history so far, task first
    pub history: &'a [ChatMessage],

    /// Sandbox leased for this run
    pub sandbox: &'a SandboxHandle,

    /// 1-based number of the turn being produced
    pub turn: usize,
}

impl<'a> TurnContext<'a> {
    pub fn last_message(&self) -> Option<&'a ChatMessage> {
        self.history.last()
    }

    /// Most recent message from `source`
    pub fn last_from(&self, source: &str) -> Option<&'a ChatMessage> {
        self.history.iter().rev().find(|m| m.is_from(source))
    }
}

/// Content of one participant turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantReply {
    pub content: String,

    /// Set when the sandbox itself failed during this turn
    pub environment_failure: Option<String>,
}

impl ParticipantReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            environment_failure: None,
        }
    }

    pub fn with_environment_failure(mut self, message: impl Into<String>) -> Self {
        self.environment_failure = Some(message.into());
        self
    }
}

/// A team member that produces one message per turn
#[async_trait]
pub trait Participant: Send + Sync {
    /// Name used as the message source
    fn name(&self) -> &str;

    async fn respond(&self, ctx: TurnContext<'_>) -> Result<ParticipantReply, AgentError>;
}
