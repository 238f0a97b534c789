//! # genie-agent
//!
//! The AlgoGenie team: a solver that writes code and an executor that runs
//! it, taking turns until the solver says the termination phrase or the turn
//! limit is hit.
//!
//! ## Components
//!
//! - **Orchestrator**: leases a sandbox, drives the turn loop, streams
//!   [`RunEvent`]s and always releases the sandbox
//! - **Participants**: [`SolverAgent`] (LLM) and [`CodeExecutorAgent`] (sandbox)
//! - **Consumer**: [`Classifier`] + [`RenderSink`] + [`consume`]
//!
//! ## Example
//!
//! ```ignore
//! let team = Orchestrator::from_config(&config, provider, manager);
//! let stream = team.run_stream("Write a function to add two numbers");
//! consume(stream, &Classifier::new(team.solver_name(), team.executor_name()), &mut sink).await;
//! ```

pub mod consumer;
pub mod error;
pub mod executor;
pub mod message;
pub mod orchestrator;
pub mod participant;
pub mod solver;
pub mod state;
pub mod termination;

// ============================================================================
// Primary Exports
// ============================================================================

pub use error::AgentError;
pub use message::{
    ChatMessage, FailureKind, RunEvent, RunFailure, StopReason, StopSignal, USER_SOURCE,
};
pub use orchestrator::{Orchestrator, RunOutcome, RunStream, TeamConfig, DEFAULT_CHANNEL_CAPACITY};
pub use state::{RunState, StateTracker};
pub use termination::TerminationPolicy;

// Participants
pub use executor::CodeExecutorAgent;
pub use participant::{Participant, ParticipantReply, TurnContext};
pub use solver::{default_system_prompt, SolverAgent};

// Consumer
pub use consumer::{consume, Classifier, DisplayEvent, RenderError, RenderSink, Role};
