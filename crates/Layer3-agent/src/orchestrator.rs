//! Turn-taking orchestrator
//!
//! Drives one run: emit the task, lease a sandbox, alternate solver and
//! executor turns until a stop condition fires, then release the sandbox and
//! emit exactly one terminal event.

use crate::error::AgentError;
use crate::executor::CodeExecutorAgent;
use crate::message::{ChatMessage, RunEvent, RunFailure, StopReason, StopSignal};
use crate::participant::{Participant, TurnContext};
use crate::solver::{default_system_prompt, SolverAgent};
use crate::state::{RunState, StateTracker};
use crate::termination::TerminationPolicy;
use futures::{FutureExt, Stream};
use genie_foundation::config::{DEFAULT_MAX_TURNS, DEFAULT_TERMINATION_PHRASE, DEFAULT_TIMEOUT_SECS};
use genie_foundation::GenieConfig;
use genie_provider::Provider;
use genie_sandbox::{extract_code_blocks, EnvironmentManager, SandboxHandle, SandboxLease};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default bound of the producer/consumer channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// TeamConfig
// ============================================================================

/// Per-run settings of the team
#[derive(Debug, Clone)]
pub struct TeamConfig {
    /// Maximum participant messages (the task does not count)
    pub max_turns: usize,

    /// Solver text that ends the run
    pub termination_phrase: String,

    /// Parent directory for per-run scratch directories
    pub work_dir: PathBuf,

    /// Per-execution time limit
    pub timeout: Duration,

    /// Events buffered between producer and consumer
    pub channel_capacity: usize,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            termination_phrase: DEFAULT_TERMINATION_PHRASE.to_string(),
            work_dir: std::env::temp_dir().join("algogenie"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl TeamConfig {
    pub fn from_config(config: &GenieConfig) -> Self {
        Self {
            max_turns: config.team.max_turns,
            termination_phrase: config.team.termination_phrase.clone(),
            work_dir: config.sandbox.work_dir.clone(),
            timeout: Duration::from_secs(config.sandbox.timeout_secs),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

// ============================================================================
// RunOutcome / RunStream
// ============================================================================

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,

    /// Task plus every participant message, in order
    pub history: Vec<ChatMessage>,

    /// The `Stopped` or `Failed` event that ended the run
    pub terminal: RunEvent,
}

impl RunOutcome {
    pub fn stop_reason(&self) -> Option<&StopReason> {
        match &self.terminal {
            RunEvent::Stopped(signal) => Some(&signal.reason),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match &self.terminal {
            RunEvent::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Live events of a run in production order
///
/// Dropping the stream cancels the run; the sandbox is still released.
pub struct RunStream {
    run_id: String,
    inner: ReceiverStream<RunEvent>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl RunStream {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Ask the run to stop; a final `Stopped(Cancelled)` still arrives
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run from elsewhere (signal handlers)
    pub fn canceller(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Stream for RunStream {
    type Item = RunEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Where events of a run go
struct Emitter {
    tx: Option<mpsc::Sender<RunEvent>>,
    cancel: CancellationToken,
}

impl Emitter {
    /// Send an in-flight event; `false` when the consumer is gone or the run
    /// was cancelled while waiting for room
    async fn emit(&self, event: RunEvent) -> bool {
        let Some(tx) = &self.tx else {
            return true;
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = tx.send(event) => {
                if sent.is_err() {
                    self.cancel.cancel();
                }
                sent.is_ok()
            }
        }
    }

    /// Send the terminal event if anyone still listens
    async fn finish(&self, event: RunEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                debug!("consumer gone before terminal event");
            }
        }
    }
}

/// How the turn loop ended
enum LoopEnd {
    Stopped(StopReason),
    Failed(AgentError),
}

/// Solver + executor team bound to one environment manager
#[derive(Clone)]
pub struct Orchestrator {
    solver: Arc<dyn Participant>,
    executor: Arc<dyn Participant>,
    manager: Arc<dyn EnvironmentManager>,
    config: TeamConfig,
    policy: TerminationPolicy,
}

impl Orchestrator {
    pub fn new(
        solver: Arc<dyn Participant>,
        executor: Arc<dyn Participant>,
        manager: Arc<dyn EnvironmentManager>,
        config: TeamConfig,
    ) -> Self {
        let policy = TerminationPolicy::new(config.termination_phrase.clone(), config.max_turns);
        Self {
            solver,
            executor,
            manager,
            config,
            policy,
        }
    }

    /// Standard solver/executor team wired from configuration
    pub fn from_config(
        config: &GenieConfig,
        provider: Arc<dyn Provider>,
        manager: Arc<dyn EnvironmentManager>,
    ) -> Self {
        let solver = SolverAgent::new(provider)
            .with_name(&config.team.solver_name)
            .with_system_prompt(default_system_prompt(&config.team.termination_phrase));
        let executor =
            CodeExecutorAgent::new(Arc::clone(&manager)).with_name(&config.team.executor_name);

        Self::new(
            Arc::new(solver),
            Arc::new(executor),
            manager,
            TeamConfig::from_config(config),
        )
    }

    pub fn config(&self) -> &TeamConfig {
        &self.config
    }

    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    /// Start a run on a background task and stream its events
    pub fn run_stream(&self, task: impl Into<String>) -> RunStream {
        let task = task.into();
        let run_id = Uuid::new_v4().simple().to_string();
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let cancel = CancellationToken::new();

        let emitter = Emitter {
            tx: Some(tx),
            cancel: cancel.clone(),
        };
        let orchestrator = self.clone();
        let id = run_id.clone();
        tokio::spawn(async move {
            orchestrator.drive(id, task, emitter).await;
        });

        RunStream {
            run_id,
            inner: ReceiverStream::new(rx),
            _guard: cancel.clone().drop_guard(),
            cancel,
        }
    }

    /// Drive a run to completion on the current task
    pub async fn run(&self, task: impl Into<String>) -> RunOutcome {
        let emitter = Emitter {
            tx: None,
            cancel: CancellationToken::new(),
        };
        self.drive(Uuid::new_v4().simple().to_string(), task.into(), emitter)
            .await
    }

    async fn drive(&self, run_id: String, task: String, emitter: Emitter) -> RunOutcome {
        let mut state = StateTracker::new(run_id.clone());
        info!(run_id = %run_id, backend = self.manager.name(), "run started");

        let task_message = ChatMessage::user(task);
        let mut history = vec![task_message.clone()];
        if !emitter.emit(RunEvent::Message(task_message)).await {
            info!(run_id = %run_id, "run cancelled before the sandbox was started");
            let _ = state.transition(RunState::Stopped);
            let terminal = RunEvent::Stopped(StopSignal::new(StopReason::Cancelled));
            emitter.finish(terminal.clone()).await;
            return RunOutcome {
                run_id,
                history,
                terminal,
            };
        }

        let lease = match SandboxLease::acquire(
            Arc::clone(&self.manager),
            &self.config.work_dir,
            self.config.timeout,
        )
        .await
        {
            Ok(lease) => lease,
            Err(e) => {
                error!(run_id = %run_id, "sandbox could not be started: {}", e);
                let _ = state.transition(RunState::Failed);
                let terminal = RunEvent::Failed(RunFailure::environment_start(e.to_string()));
                emitter.finish(terminal.clone()).await;
                return RunOutcome {
                    run_id,
                    history,
                    terminal,
                };
            }
        };
        info!(run_id = %run_id, sandbox = %lease.handle().id(), "sandbox acquired");

        let end = if emitter.cancel.is_cancelled() {
            LoopEnd::Stopped(StopReason::Cancelled)
        } else {
            self.turn_loop(&run_id, &mut state, &mut history, lease.handle(), &emitter)
                .await
        };

        if let Err(e) = lease.release().await {
            warn!(run_id = %run_id, "sandbox release failed: {}", e);
        }

        let terminal = match end {
            LoopEnd::Stopped(reason) => {
                let _ = state.transition(RunState::Stopped);
                info!(run_id = %run_id, turns = history.len() - 1, "run stopped: {}", reason);
                RunEvent::Stopped(StopSignal::new(reason))
            }
            LoopEnd::Failed(e) => {
                let _ = state.transition(RunState::Failed);
                error!(run_id = %run_id, turns = history.len() - 1, "run failed: {}", e);
                RunEvent::Failed(RunFailure::orchestration(e.to_string()))
            }
        };
        emitter.finish(terminal.clone()).await;

        RunOutcome {
            run_id,
            history,
            terminal,
        }
    }

    async fn turn_loop(
        &self,
        run_id: &str,
        state: &mut StateTracker,
        history: &mut Vec<ChatMessage>,
        sandbox: &SandboxHandle,
        emitter: &Emitter,
    ) -> LoopEnd {
        let mut turns = 0usize;
        let mut next = RunState::SolverTurn;

        loop {
            if let Err(e) = state.transition(next) {
                return LoopEnd::Failed(e);
            }
            let (participant, from_solver) = match next {
                RunState::SolverTurn => (&self.solver, true),
                RunState::ExecutorTurn => (&self.executor, false),
                other => {
                    return LoopEnd::Failed(AgentError::Internal(format!(
                        "no participant for state {}",
                        other
                    )))
                }
            };
            turns += 1;
            debug!(run_id = %run_id, turn = turns, participant = participant.name(), "turn started");

            let ctx = TurnContext {
                history: history.as_slice(),
                sandbox,
                turn: turns,
            };
            let respond = AssertUnwindSafe(participant.respond(ctx)).catch_unwind();
            let reply = tokio::select! {
                biased;
                _ = emitter.cancel.cancelled() => return LoopEnd::Stopped(StopReason::Cancelled),
                reply = respond => reply,
            };
            let reply = match reply {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => return LoopEnd::Failed(e),
                Err(payload) => {
                    return LoopEnd::Failed(AgentError::Internal(format!(
                        "participant '{}' panicked: {}",
                        participant.name(),
                        panic_message(payload.as_ref())
                    )))
                }
            };

            let message = ChatMessage::new(participant.name(), reply.content);
            history.push(message.clone());
            if !emitter.emit(RunEvent::Message(message.clone())).await {
                return LoopEnd::Stopped(StopReason::Cancelled);
            }

            if let Some(failure) = reply.environment_failure {
                return LoopEnd::Stopped(StopReason::EnvironmentFailure { message: failure });
            }
            if let Some(reason) = self.policy.check(&message, from_solver, turns) {
                return LoopEnd::Stopped(reason);
            }

            next = if from_solver && !extract_code_blocks(&message.content).is_empty() {
                RunState::ExecutorTurn
            } else {
                RunState::SolverTurn
            };
        }
    }
}

/// Text of a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
