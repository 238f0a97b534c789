//! Conversation messages and run events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Source name of the message that carries the task
pub const USER_SOURCE: &str = "user";

// ============================================================================
// ChatMessage
// ============================================================================

/// One immutable entry of a run's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,

    /// `"user"` or a participant name
    pub source: String,

    pub content: String,

    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// The task message that seeds a run
    pub fn user(task: impl Into<String>) -> Self {
        Self::new(USER_SOURCE, task)
    }

    pub fn is_from(&self, source: &str) -> bool {
        self.source == source
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.content)
    }
}

// ============================================================================
// StopSignal
// ============================================================================

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StopReason {
    /// The solver said the termination phrase
    ExplicitTermination { phrase: String },

    /// Participant turns reached the configured maximum
    TurnLimit { max_turns: usize },

    /// The sandbox broke while executing code
    EnvironmentFailure { message: String },

    /// The consumer went away or cancelled the run
    Cancelled,
}

impl StopReason {
    /// Short human-readable reason
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::ExplicitTermination { .. } => "explicit termination",
            StopReason::TurnLimit { .. } => "turn limit",
            StopReason::EnvironmentFailure { .. } => "environment failure",
            StopReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::ExplicitTermination { phrase } => {
                write!(f, "explicit termination ('{}' mentioned)", phrase)
            }
            StopReason::TurnLimit { max_turns } => {
                write!(f, "turn limit (maximum of {} turns reached)", max_turns)
            }
            StopReason::EnvironmentFailure { message } => {
                write!(f, "environment failure ({})", message)
            }
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal marker of a run that stopped normally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopSignal {
    pub reason: StopReason,
}

impl StopSignal {
    pub fn new(reason: StopReason) -> Self {
        Self { reason }
    }
}

// ============================================================================
// RunFailure
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// The sandbox could not be acquired
    EnvironmentStart,

    /// A participant or the loop itself failed
    Orchestration,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::EnvironmentStart => write!(f, "environment start failure"),
            FailureKind::Orchestration => write!(f, "orchestration failure"),
        }
    }
}

/// Terminal marker of a run that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl RunFailure {
    pub fn environment_start(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::EnvironmentStart,
            message: message.into(),
        }
    }

    pub fn orchestration(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Orchestration,
            message: message.into(),
        }
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// ============================================================================
// RunEvent
// ============================================================================

/// Item of a run stream
///
/// A stream carries zero or more `Message`s followed by exactly one
/// `Stopped` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum RunEvent {
    Message(ChatMessage),
    Stopped(StopSignal),
    Failed(RunFailure),
}

impl RunEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunEvent::Message(_))
    }

    pub fn as_message(&self) -> Option<&ChatMessage> {
        match self {
            RunEvent::Message(message) => Some(message),
            _ => None,
        }
    }
}
