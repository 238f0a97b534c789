//! Execution environment manager trait

use crate::code::{CodeBlock, ExecutionResult};
use crate::error::SandboxError;
use crate::handle::SandboxHandle;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Creates, runs code in, and tears down isolated execution contexts
///
/// Implementations must make `release` idempotent: the first call tears the
/// context down, later calls return `Ok(())` without touching anything.
#[async_trait]
pub trait EnvironmentManager: Send + Sync {
    /// Back-end name for logs
    fn name(&self) -> &'static str;

    /// Bring up a fresh context rooted under `work_dir`
    ///
    /// On error nothing is left running.
    async fn acquire(
        &self,
        work_dir: &Path,
        timeout: Duration,
    ) -> Result<SandboxHandle, SandboxError>;

    /// Tear the context down
    async fn release(&self, handle: &SandboxHandle) -> Result<(), SandboxError>;

    /// Run one code block
    ///
    /// Non-zero exits, timeouts and unknown languages are reported in the
    /// returned [`ExecutionResult`]. `Err` means the environment itself broke.
    async fn execute(
        &self,
        handle: &SandboxHandle,
        block: &CodeBlock,
    ) -> Result<ExecutionResult, SandboxError>;
}

/// Fail with `Released` if the handle is no longer usable
pub(crate) fn ensure_live(handle: &SandboxHandle) -> Result<(), SandboxError> {
    if handle.is_released() {
        return Err(SandboxError::Released(handle.id().to_string()));
    }
    Ok(())
}

/// Unique script file name for one execution
pub(crate) fn script_name(extension: &str) -> String {
    format!("tmp_code_{}.{}", Uuid::new_v4().simple(), extension)
}
