//! Web UI server: index page, SSE run endpoint, health check

use crate::app::App;
use crate::page;
use crate::render::HtmlSink;
use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures::{stream, StreamExt};
use genie_agent::consume;
use serde::Deserialize;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Fragments buffered between the renderer and the HTTP response
const FRAGMENT_BUFFER: usize = 32;

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    #[serde(default)]
    task: String,
}

pub fn router(app: App) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/run", get(run))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

/// Bind and serve until Ctrl-C
pub async fn serve(app: App) -> anyhow::Result<()> {
    let bind = app.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;

    info!(
        address = %bind,
        backend = %app.config.sandbox.backend,
        model = %app.config.provider.model,
        "AlgoGenie web UI listening on http://{}",
        bind
    );

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

async fn index() -> Html<String> {
    Html(page::index())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/run?task=... - stream one run as SSE
///
/// Each rendered event is a `message` event carrying an HTML fragment,
/// followed by a single `done` event. A client disconnect drops the run
/// stream, which cancels the run and releases its sandbox.
async fn run(State(app): State<App>, Query(query): Query<RunQuery>) -> Response {
    let task = query.task.trim();
    if task.is_empty() {
        return (StatusCode::BAD_REQUEST, page::EMPTY_TASK_MESSAGE).into_response();
    }

    let run_stream = app.team.run_stream(task);
    let run_id = run_stream.run_id().to_string();
    info!(run_id = %run_id, "run requested");

    let (tx, rx) = mpsc::channel::<String>(FRAGMENT_BUFFER);
    tokio::spawn(async move {
        let mut sink = HtmlSink::new(tx.clone());
        tokio::select! {
            _ = consume(run_stream, &app.classifier, &mut sink) => {
                debug!(run_id = %run_id, "run stream drained");
            }
            _ = tx.closed() => {
                info!(run_id = %run_id, "client disconnected, cancelling run");
            }
        }
    });

    let events = ReceiverStream::new(rx)
        .map(|html| Ok::<_, Infallible>(Event::default().event("message").data(html)))
        .chain(stream::once(async {
            Ok::<_, Infallible>(Event::default().event("done").data("end"))
        }));

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use genie_foundation::{GenieConfig, SandboxBackend};
    use genie_provider::{
        FinishReason, Message, ModelInfo, Provider, ProviderError, ProviderMetadata,
        ProviderResponse, TokenUsage,
    };
    use genie_sandbox::LocalEnvironment;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Answers every request with a finished solution
    struct DoneProvider {
        metadata: ProviderMetadata,
        model: ModelInfo,
    }

    impl DoneProvider {
        fn new() -> Self {
            Self {
                metadata: ProviderMetadata {
                    id: "done".into(),
                    display_name: "Done".into(),
                    default_model: "done-1".into(),
                    base_url: None,
                },
                model: ModelInfo::new("done-1", "done"),
            }
        }
    }

    #[async_trait]
    impl Provider for DoneProvider {
        fn metadata(&self) -> &ProviderMetadata {
            &self.metadata
        }

        fn model(&self) -> &ModelInfo {
            &self.model
        }

        async fn complete(
            &self,
            _messages: Vec<Message>,
            _system_prompt: Option<String>,
        ) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                content: "def add(a, b): return a + b <done> TERMINATE".into(),
                usage: TokenUsage::default(),
                finish_reason: FinishReason::Stop,
                model: "done-1".into(),
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn test_app(work_dir: &std::path::Path) -> App {
        let mut config = GenieConfig::default().backend(SandboxBackend::Local);
        config.sandbox.work_dir = work_dir.to_path_buf();
        App::with_parts(
            config,
            Arc::new(DoneProvider::new()),
            Arc::new(LocalEnvironment::new()),
        )
    }

    async fn get(app: App, uri: &str) -> (StatusCode, String) {
        let response = router(app)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(test_app(dir.path()), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_index_page() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(test_app(dir.path()), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("AlgoGenie DSA Solver"));
    }

    #[tokio::test]
    async fn test_blank_task_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(test_app(dir.path()), "/api/run?task=%20%20").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Please enter a problem first.");

        let (status, _) = get(test_app(dir.path()), "/api/run").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_run_streams_fragments_then_done() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(
            test_app(dir.path()),
            "/api/run?task=Write%20a%20function%20to%20add%20two%20numbers",
        )
        .await;

        assert_eq!(status, StatusCode::OK);

        let user = body.find("role-user").unwrap();
        let solver = body.find("role-agent").unwrap();
        let stop = body.find("role-stop").unwrap();
        let done = body.find("event: done").unwrap();
        assert!(user < solver && solver < stop && stop < done);

        assert!(body.contains("Write a function to add two numbers"));
        assert!(body.contains("&lt;done&gt;"));
        assert_eq!(body.matches("event: message").count(), 3);

        // The per-run sandbox directory is gone once the stream has ended
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
