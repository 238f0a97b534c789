//! Non-interactive CLI mode

use crate::app::App;
use crate::render::TerminalSink;
use genie_agent::{consume, Role};
use tracing::{info, warn};

/// Solve one problem, printing each event as it arrives
///
/// Ctrl-C cancels the run; the stream is still drained so the sandbox is
/// released before returning.
pub async fn run_once(app: &App, task: &str) -> anyhow::Result<()> {
    let task = task.trim();
    if task.is_empty() {
        anyhow::bail!("Please enter a problem first.");
    }

    println!("AlgoGenie - Solving...\n");

    let stream = app.team.run_stream(task);
    let run_id = stream.run_id().to_string();
    let canceller = stream.canceller();

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling run");
            canceller.cancel();
        }
    });

    let mut sink = TerminalSink::new(std::io::stdout());
    consume(stream, &app.classifier, &mut sink).await;
    interrupt.abort();

    info!(run_id = %run_id, "run finished");
    match sink.last() {
        Some(event) if event.role == Role::Error => {
            anyhow::bail!("run {} failed: {}", run_id, event.reason.as_deref().unwrap_or("unknown"))
        }
        _ => Ok(()),
    }
}
