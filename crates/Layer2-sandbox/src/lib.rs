//! # genie-sandbox
//!
//! Execution environments for code proposed by the solver.
//!
//! An [`EnvironmentManager`] brings up an isolated context, runs code blocks
//! inside it and tears it down again. [`SandboxLease`] ties the teardown to
//! ownership so a context never outlives its run.
//!
//! Back-ends:
//! - [`DockerEnvironment`]: one container per run (default)
//! - [`LocalEnvironment`]: host processes, for development without Docker

pub mod code;
pub mod docker;
pub mod error;
pub mod handle;
pub mod lease;
pub mod local;
pub mod manager;

pub use code::{
    extract_code_blocks, CodeBlock, ExecutionOutcome, ExecutionResult, Language,
    DEFAULT_LANGUAGE, TIMEOUT_EXIT_CODE,
};
pub use docker::DockerEnvironment;
pub use error::SandboxError;
pub use handle::SandboxHandle;
pub use lease::SandboxLease;
pub use local::LocalEnvironment;
pub use manager::EnvironmentManager;
