//! Stream consumer: classify run events and hand them to a render sink

use crate::message::{ChatMessage, RunEvent, USER_SOURCE};
use async_trait::async_trait;
use futures::{pin_mut, Stream, StreamExt};
use genie_foundation::config::{DEFAULT_EXECUTOR_NAME, DEFAULT_SOLVER_NAME};
use genie_foundation::Error as FoundationError;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// DisplayEvent
// ============================================================================

/// Presentation role of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Solver,
    Executor,
    Stop,
    Error,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "🧑 User",
            Role::Solver => "💻 Solver Agent",
            Role::Executor => "🤖 Code Executor",
            Role::Stop => "🛑 Finished",
            Role::Error => "⛔ Error",
        }
    }

    /// CSS class used by the web UI
    pub fn css_class(&self) -> &'static str {
        match self {
            Role::User => "role-user",
            Role::Solver => "role-agent",
            Role::Executor => "role-exec",
            Role::Stop => "role-stop",
            Role::Error => "role-error",
        }
    }
}

/// A run event ready to be rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayEvent {
    /// Position in the run, starting at 0
    pub sequence: u64,
    pub role: Role,
    pub label: String,
    pub content: String,
    /// Short stop or failure reason for terminal events
    pub reason: Option<String>,
}

// ============================================================================
// Classifier
// ============================================================================

/// Maps run events to display roles by message source
#[derive(Debug, Clone)]
pub struct Classifier {
    solver_name: String,
    executor_name: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_SOLVER_NAME, DEFAULT_EXECUTOR_NAME)
    }
}

impl Classifier {
    pub fn new(solver_name: impl Into<String>, executor_name: impl Into<String>) -> Self {
        Self {
            solver_name: solver_name.into(),
            executor_name: executor_name.into(),
        }
    }

    fn role_of(&self, message: &ChatMessage) -> Role {
        if message.is_from(USER_SOURCE) {
            Role::User
        } else if message.is_from(&self.solver_name) {
            Role::Solver
        } else if message.is_from(&self.executor_name) {
            Role::Executor
        } else {
            Role::Error
        }
    }

    pub fn classify(&self, sequence: u64, event: &RunEvent) -> DisplayEvent {
        let (role, content, reason) = match event {
            RunEvent::Message(message) => {
                let role = self.role_of(message);
                let content = if role == Role::Error {
                    format!("unexpected message from '{}': {}", message.source, message.content)
                } else {
                    message.content.clone()
                };
                (role, content, None)
            }
            RunEvent::Stopped(signal) => (
                Role::Stop,
                format!("Stop Reason: {}", signal.reason),
                Some(signal.reason.as_str().to_string()),
            ),
            RunEvent::Failed(failure) => (
                Role::Error,
                format!("Error: {}", failure.message),
                Some(failure.kind.to_string()),
            ),
        };

        DisplayEvent {
            sequence,
            role,
            label: role.label().to_string(),
            content,
            reason,
        }
    }
}

// ============================================================================
// RenderSink
// ============================================================================

#[derive(Error, Debug)]
pub enum RenderError {
    /// The output went away (client disconnected, pipe closed)
    #[error("Render target closed")]
    Closed,

    #[error("Render failed: {0}")]
    Format(String),
}

impl From<RenderError> for FoundationError {
    fn from(err: RenderError) -> Self {
        FoundationError::Render(err.to_string())
    }
}

/// Destination of display events
#[async_trait]
pub trait RenderSink: Send {
    async fn render(&mut self, event: &DisplayEvent) -> Result<(), RenderError>;
}

/// Pull every event from `stream` and render it in order
///
/// A failed render is logged and skipped; the stream is drained to the end.
pub async fn consume<S, R>(stream: S, classifier: &Classifier, sink: &mut R)
where
    S: Stream<Item = RunEvent>,
    R: RenderSink + ?Sized,
{
    pin_mut!(stream);
    let mut sequence = 0u64;

    while let Some(event) = stream.next().await {
        let rendered = classifier.classify(sequence, &event);
        debug!(sequence, role = ?rendered.role, "rendering event");
        if let Err(e) = sink.render(&rendered).await {
            warn!(sequence, "failed to render event: {}", e);
        }
        sequence += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{RunFailure, StopReason, StopSignal};

    #[derive(Default)]
    struct CollectingSink {
        events: Vec<DisplayEvent>,
        fail_on: Option<u64>,
    }

    #[async_trait]
    impl RenderSink for CollectingSink {
        async fn render(&mut self, event: &DisplayEvent) -> Result<(), RenderError> {
            if self.fail_on == Some(event.sequence) {
                return Err(RenderError::Format("boom".into()));
            }
            self.events.push(event.clone());
            Ok(())
        }
    }

    fn events() -> Vec<RunEvent> {
        vec![
            RunEvent::Message(ChatMessage::user("Write a function to add two numbers")),
            RunEvent::Message(ChatMessage::new(DEFAULT_SOLVER_NAME, "```python\nprint(5)\n```")),
            RunEvent::Message(ChatMessage::new(DEFAULT_EXECUTOR_NAME, "5")),
            RunEvent::Stopped(StopSignal::new(StopReason::ExplicitTermination {
                phrase: "TERMINATE".into(),
            })),
        ]
    }

    #[test]
    fn test_classify_roles() {
        let classifier = Classifier::default();
        let roles: Vec<Role> = events()
            .iter()
            .enumerate()
            .map(|(i, e)| classifier.classify(i as u64, e).role)
            .collect();
        assert_eq!(roles, vec![Role::User, Role::Solver, Role::Executor, Role::Stop]);
    }

    #[test]
    fn test_classify_terminal_reason() {
        let classifier = Classifier::default();
        let stop = classifier.classify(3, &events()[3]);
        assert_eq!(stop.reason.as_deref(), Some("explicit termination"));
        assert!(stop.content.starts_with("Stop Reason:"));
        assert_eq!(stop.label, "🛑 Finished");

        let failed = classifier.classify(
            1,
            &RunEvent::Failed(RunFailure::environment_start("daemon down")),
        );
        assert_eq!(failed.role, Role::Error);
        assert_eq!(failed.content, "Error: daemon down");
    }

    #[test]
    fn test_unknown_source_is_error() {
        let classifier = Classifier::default();
        let event = classifier.classify(0, &RunEvent::Message(ChatMessage::new("intruder", "hi")));
        assert_eq!(event.role, Role::Error);
        assert_eq!(event.role.css_class(), "role-error");
    }

    #[tokio::test]
    async fn test_consume_preserves_order() {
        let mut sink = CollectingSink::default();
        consume(futures::stream::iter(events()), &Classifier::default(), &mut sink).await;

        let sequences: Vec<u64> = sink.events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
        assert_eq!(sink.events[2].content, "5");
    }

    #[test]
    fn test_render_error_is_isolated() {
        let mut sink = CollectingSink {
            fail_on: Some(1),
            ..Default::default()
        };
        tokio_test::block_on(consume(
            futures::stream::iter(events()),
            &Classifier::default(),
            &mut sink,
        ));

        let roles: Vec<Role> = sink.events.iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Executor, Role::Stop]);
    }
}
