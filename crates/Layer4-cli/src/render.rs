//! Render sinks for the web UI and the terminal

use async_trait::async_trait;
use genie_agent::{DisplayEvent, RenderError, RenderSink};
use std::io::Write;
use tokio::sync::mpsc;

/// Escaped HTML fragment for one event
///
/// Carriage returns are dropped; SSE data lines cannot carry them.
pub fn html_fragment(event: &DisplayEvent) -> String {
    let content = event.content.replace('\r', "");
    format!(
        "<div class=\"msg-block {}\"><b>{}</b><div class=\"msg-content\">{}</div></div>",
        event.role.css_class(),
        html_escape::encode_text(&event.label),
        html_escape::encode_text(&content),
    )
}

// ============================================================================
// HtmlSink
// ============================================================================

/// Pushes HTML fragments to an SSE response
pub struct HtmlSink {
    tx: mpsc::Sender<String>,
}

impl HtmlSink {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl RenderSink for HtmlSink {
    async fn render(&mut self, event: &DisplayEvent) -> Result<(), RenderError> {
        self.tx
            .send(html_fragment(event))
            .await
            .map_err(|_| RenderError::Closed)
    }
}

// ============================================================================
// TerminalSink
// ============================================================================

/// Labelled plain text, one block per event
pub struct TerminalSink<W> {
    out: W,
    last: Option<DisplayEvent>,
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    /// Last event rendered, usually the terminal one
    pub fn last(&self) -> Option<&DisplayEvent> {
        self.last.as_ref()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> RenderSink for TerminalSink<W> {
    async fn render(&mut self, event: &DisplayEvent) -> Result<(), RenderError> {
        let write = |out: &mut W| -> std::io::Result<()> {
            writeln!(out, "{}", event.label)?;
            writeln!(out, "{}", event.content.trim_end())?;
            writeln!(out)?;
            out.flush()
        };

        self.last = Some(event.clone());
        write(&mut self.out).map_err(|e| match e.kind() {
            std::io::ErrorKind::BrokenPipe => RenderError::Closed,
            _ => RenderError::Format(e.to_string()),
        })
    }
}
