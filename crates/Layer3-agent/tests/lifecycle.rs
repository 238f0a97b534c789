//! Run lifecycle tests: stream shape, stop conditions and sandbox release
//!
//! `cargo test -p genie-agent --test lifecycle`

use async_trait::async_trait;
use futures::StreamExt;
use genie_agent::{
    consume, AgentError, ChatMessage, Classifier, CodeExecutorAgent, DisplayEvent, FailureKind,
    Orchestrator, Participant, ParticipantReply, RenderError, RenderSink, Role, RunEvent,
    StopReason, TeamConfig, TurnContext,
};
use genie_sandbox::{CodeBlock, EnvironmentManager, ExecutionResult, SandboxError, SandboxHandle};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SOLVER: &str = "DSA_Problem_Solver_Agent";
const EXECUTOR: &str = "CodeExecutorAgent";
const ADD_TASK: &str = "Write a function to add two numbers.";
const ADD_CODE: &str = "Here is the solution:\n```python\ndef add(a, b):\n    return a + b\n\nprint(add(2, 3))\n```";

// ============================================================================
// Fakes
// ============================================================================

enum ExecMode {
    Output(&'static str),
    Timeout,
    Broken,
}

/// Environment manager that counts every call
struct FakeManager {
    acquires: AtomicUsize,
    releases: AtomicUsize,
    executions: AtomicUsize,
    fail_acquire: bool,
    mode: ExecMode,
}

impl FakeManager {
    fn new(mode: ExecMode) -> Arc<Self> {
        Arc::new(Self {
            acquires: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            executions: AtomicUsize::new(0),
            fail_acquire: false,
            mode,
        })
    }

    fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            acquires: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            executions: AtomicUsize::new(0),
            fail_acquire: true,
            mode: ExecMode::Output(""),
        })
    }

    fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnvironmentManager for FakeManager {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn acquire(
        &self,
        work_dir: &Path,
        timeout: Duration,
    ) -> Result<SandboxHandle, SandboxError> {
        if self.fail_acquire {
            return Err(SandboxError::StartFailed(
                "Docker daemon unreachable".to_string(),
            ));
        }
        self.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(SandboxHandle::new(work_dir, timeout))
    }

    async fn release(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        handle.mark_released();
        Ok(())
    }

    async fn execute(
        &self,
        handle: &SandboxHandle,
        _block: &CodeBlock,
    ) -> Result<ExecutionResult, SandboxError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            ExecMode::Output(out) => Ok(ExecutionResult::from_exit(0, out)),
            ExecMode::Timeout => Ok(ExecutionResult::timed_out("", handle.timeout())),
            ExecMode::Broken => Err(SandboxError::Runtime("container is gone".to_string())),
        }
    }
}

enum Step {
    Say(&'static str),
    Fail,
    Hang,
    Panic,
}

/// Solver that plays back a script, then says TERMINATE
struct ScriptedSolver {
    steps: Mutex<VecDeque<Step>>,
}

impl ScriptedSolver {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
        })
    }
}

#[async_trait]
impl Participant for ScriptedSolver {
    fn name(&self) -> &str {
        SOLVER
    }

    async fn respond(&self, _ctx: TurnContext<'_>) -> Result<ParticipantReply, AgentError> {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Say(text)) => Ok(ParticipantReply::text(text)),
            Some(Step::Fail) => Err(AgentError::Internal("model unavailable".to_string())),
            Some(Step::Hang) => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
            Some(Step::Panic) => panic!("solver crashed"),
            None => Ok(ParticipantReply::text("TERMINATE")),
        }
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Vec<DisplayEvent>,
}

#[async_trait]
impl RenderSink for CollectingSink {
    async fn render(&mut self, event: &DisplayEvent) -> Result<(), RenderError> {
        self.events.push(event.clone());
        Ok(())
    }
}

fn team(solver: Arc<ScriptedSolver>, manager: Arc<FakeManager>, max_turns: usize) -> Orchestrator {
    let executor = CodeExecutorAgent::new(manager.clone()).with_name(EXECUTOR);
    let config = TeamConfig {
        max_turns,
        work_dir: PathBuf::from("/tmp/algogenie-tests"),
        timeout: Duration::from_secs(120),
        ..Default::default()
    };
    Orchestrator::new(solver, Arc::new(executor), manager, config)
}

fn sources(history: &[ChatMessage]) -> Vec<&str> {
    history.iter().map(|m| m.source.as_str()).collect()
}

async fn collect(team: &Orchestrator, task: &str) -> Vec<RunEvent> {
    team.run_stream(task).collect().await
}

async fn wait_for_release(manager: &FakeManager) {
    for _ in 0..200 {
        if manager.releases() > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn assert_single_terminal_last(events: &[RunEvent]) {
    let terminals: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_terminal())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(terminals, vec![events.len() - 1], "events: {events:?}");
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_add_two_numbers() {
    let manager = FakeManager::new(ExecMode::Output("5\n"));
    let solver = ScriptedSolver::new(vec![
        Step::Say(ADD_CODE),
        Step::Say("The output is 5, as expected. TERMINATE"),
    ]);

    let outcome = team(solver, manager.clone(), 10).run(ADD_TASK).await;

    assert_eq!(sources(&outcome.history), vec!["user", SOLVER, EXECUTOR, SOLVER]);
    assert_eq!(outcome.history[0].content, ADD_TASK);
    assert_eq!(outcome.history[2].content, "5");
    assert_eq!(outcome.stop_reason().map(|r| r.as_str()), Some("explicit termination"));
    assert_eq!(manager.acquires(), 1);
    assert_eq!(manager.executions(), 1);
    assert_eq!(manager.releases(), 1);
}

#[tokio::test]
async fn test_stream_shape() {
    let manager = FakeManager::new(ExecMode::Output("5\n"));
    let solver = ScriptedSolver::new(vec![Step::Say(ADD_CODE)]);

    let events = collect(&team(solver, manager.clone(), 10), ADD_TASK).await;

    assert_single_terminal_last(&events);
    assert_eq!(events[0].as_message().unwrap().source, "user");
    assert!(matches!(
        events.last(),
        Some(RunEvent::Stopped(signal)) if matches!(signal.reason, StopReason::ExplicitTermination { .. })
    ));
    assert_eq!(manager.releases(), 1);
}

#[tokio::test]
async fn test_zero_code_blocks_skips_executor() {
    let manager = FakeManager::new(ExecMode::Output("unused"));
    let solver = ScriptedSolver::new(vec![
        Step::Say("Let me think about the constraints first."),
        Step::Say("Adding two numbers needs no loop."),
    ]);

    let outcome = team(solver, manager.clone(), 10).run(ADD_TASK).await;

    assert_eq!(sources(&outcome.history), vec!["user", SOLVER, SOLVER, SOLVER]);
    assert_eq!(manager.executions(), 0);
    assert_eq!(manager.releases(), 1);
}

#[tokio::test]
async fn test_turn_limit() {
    let manager = FakeManager::new(ExecMode::Output("5\n"));
    let solver = ScriptedSolver::new(vec![Step::Say(ADD_CODE), Step::Say(ADD_CODE), Step::Say(ADD_CODE)]);

    let outcome = team(solver, manager.clone(), 4).run(ADD_TASK).await;

    assert_eq!(outcome.history.len(), 5);
    assert_eq!(outcome.stop_reason(), Some(&StopReason::TurnLimit { max_turns: 4 }));
    assert_eq!(outcome.stop_reason().map(|r| r.as_str()), Some("turn limit"));
    assert_eq!(manager.releases(), 1);
}

#[tokio::test]
async fn test_timeout_stays_in_conversation() {
    let manager = FakeManager::new(ExecMode::Timeout);
    let solver = ScriptedSolver::new(vec![
        Step::Say("```python\nwhile True:\n    pass\n```"),
        Step::Say("That loop never ends; the iterative version is fine. TERMINATE"),
    ]);

    let outcome = team(solver, manager.clone(), 10).run(ADD_TASK).await;

    assert_eq!(sources(&outcome.history), vec!["user", SOLVER, EXECUTOR, SOLVER]);
    assert!(outcome.history[2].content.contains("ExecutionTimeoutError"));
    assert!(matches!(
        outcome.stop_reason(),
        Some(StopReason::ExplicitTermination { .. })
    ));
    assert_eq!(manager.releases(), 1);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_acquire_failure() {
    let manager = FakeManager::unavailable();
    let solver = ScriptedSolver::new(vec![Step::Say(ADD_CODE)]);

    let events = collect(&team(solver, manager.clone(), 10), ADD_TASK).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].as_message().map(|m| m.source.as_str()), Some("user"));
    match &events[1] {
        RunEvent::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::EnvironmentStart);
            assert!(failure.message.contains("Docker daemon unreachable"));
        }
        other => panic!("unexpected terminal event: {other:?}"),
    }
    assert_eq!(manager.releases(), 0);
}

#[tokio::test]
async fn test_solver_failure_keeps_partial_history() {
    let manager = FakeManager::new(ExecMode::Output("5\n"));
    let solver = ScriptedSolver::new(vec![Step::Say(ADD_CODE), Step::Fail]);

    let outcome = team(solver, manager.clone(), 10).run(ADD_TASK).await;

    assert_eq!(sources(&outcome.history), vec!["user", SOLVER, EXECUTOR]);
    let failure = outcome.failure().expect("run should fail");
    assert_eq!(failure.kind, FailureKind::Orchestration);
    assert!(failure.message.contains("model unavailable"));
    assert_eq!(manager.releases(), 1);
}

#[tokio::test]
async fn test_environment_failure_during_execution() {
    let manager = FakeManager::new(ExecMode::Broken);
    let solver = ScriptedSolver::new(vec![Step::Say(ADD_CODE)]);

    let events = collect(&team(solver, manager.clone(), 10), ADD_TASK).await;

    assert_single_terminal_last(&events);
    assert_eq!(events.len(), 4);
    assert!(events[2]
        .as_message()
        .unwrap()
        .content
        .contains("container is gone"));
    assert!(matches!(
        events.last(),
        Some(RunEvent::Stopped(signal)) if matches!(signal.reason, StopReason::EnvironmentFailure { .. })
    ));
    assert_eq!(manager.releases(), 1);
}

#[tokio::test]
async fn test_participant_panic_fails_run_and_releases() {
    let manager = FakeManager::new(ExecMode::Output("5\n"));
    let solver = ScriptedSolver::new(vec![Step::Panic]);

    let events = collect(&team(solver, manager.clone(), 10), ADD_TASK).await;

    assert_single_terminal_last(&events);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].as_message().unwrap().source, "user");
    match events.last() {
        Some(RunEvent::Failed(failure)) => {
            assert_eq!(failure.kind, FailureKind::Orchestration);
            assert!(failure.message.contains("solver crashed"));
        }
        other => panic!("expected a failure, got {other:?}"),
    }
    assert_eq!(manager.acquires(), 1);
    assert_eq!(manager.releases(), 1);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_dropping_stream_cancels_and_releases() {
    let manager = FakeManager::new(ExecMode::Output("5\n"));
    let solver = ScriptedSolver::new(vec![Step::Say(ADD_CODE), Step::Hang]);
    let team = team(solver, manager.clone(), 10);

    let mut stream = team.run_stream(ADD_TASK);
    for _ in 0..3 {
        assert!(stream.next().await.is_some());
    }
    drop(stream);

    wait_for_release(&manager).await;
    assert_eq!(manager.acquires(), 1);
    assert_eq!(manager.releases(), 1);
}

#[tokio::test]
async fn test_explicit_cancel() {
    let manager = FakeManager::new(ExecMode::Output("5\n"));
    let solver = ScriptedSolver::new(vec![Step::Hang]);
    let team = team(solver, manager.clone(), 10);

    let mut stream = team.run_stream(ADD_TASK);
    let first = stream.next().await.unwrap();
    assert_eq!(first.as_message().unwrap().source, "user");

    stream.cancel();
    let rest: Vec<RunEvent> = stream.collect().await;

    assert_eq!(rest.len(), 1);
    assert!(matches!(
        &rest[0],
        RunEvent::Stopped(signal) if signal.reason == StopReason::Cancelled
    ));
    assert_eq!(manager.releases(), 1);
}

// ============================================================================
// Consumer
// ============================================================================

#[tokio::test]
async fn test_consume_renders_in_order() {
    let manager = FakeManager::new(ExecMode::Output("5\n"));
    let solver = ScriptedSolver::new(vec![Step::Say(ADD_CODE)]);
    let team = team(solver, manager.clone(), 10);

    let mut sink = CollectingSink::default();
    let classifier = Classifier::new(team.solver_name(), team.executor_name());
    consume(team.run_stream(ADD_TASK), &classifier, &mut sink).await;

    let roles: Vec<Role> = sink.events.iter().map(|e| e.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Solver, Role::Executor, Role::Solver, Role::Stop]
    );
    let sequences: Vec<u64> = sink.events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    assert_eq!(manager.releases(), 1);
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let manager = FakeManager::new(ExecMode::Output("5\n"));
    let first = team(ScriptedSolver::new(vec![Step::Say(ADD_CODE)]), manager.clone(), 10);
    let second = team(ScriptedSolver::new(vec![Step::Say("no code")]), manager.clone(), 10);

    let (a, b) = tokio::join!(first.run(ADD_TASK), second.run("Reverse a string"));

    assert_ne!(a.run_id, b.run_id);
    assert_eq!(sources(&a.history), vec!["user", SOLVER, EXECUTOR, SOLVER]);
    assert_eq!(sources(&b.history), vec!["user", SOLVER, SOLVER]);
    assert_eq!(manager.acquires(), 2);
    assert_eq!(manager.releases(), 2);
}
