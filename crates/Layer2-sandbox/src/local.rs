//! Host-process back-end
//!
//! Runs code directly on the host inside a per-run scratch directory. There
//! is no isolation; use it for development machines without Docker.

use crate::code::{combine_output, CodeBlock, ExecutionResult};
use crate::error::SandboxError;
use crate::handle::SandboxHandle;
use crate::manager::{ensure_live, script_name, EnvironmentManager};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Runs interpreters as child processes of the current process
#[derive(Debug, Default, Clone)]
pub struct LocalEnvironment;

impl LocalEnvironment {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EnvironmentManager for LocalEnvironment {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn acquire(
        &self,
        work_dir: &Path,
        timeout: Duration,
    ) -> Result<SandboxHandle, SandboxError> {
        let id = Uuid::new_v4().simple().to_string();
        let run_dir = work_dir.join(&id);
        tokio::fs::create_dir_all(&run_dir).await.map_err(|e| {
            SandboxError::StartFailed(format!("cannot create {}: {}", run_dir.display(), e))
        })?;

        let handle = SandboxHandle::with_id(id, run_dir, timeout);
        info!(sandbox = %handle.id(), dir = %handle.work_dir().display(), "local sandbox ready");
        Ok(handle)
    }

    async fn release(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        if !handle.mark_released() {
            debug!(sandbox = %handle.id(), "already released");
            return Ok(());
        }

        match tokio::fs::remove_dir_all(handle.work_dir()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(sandbox = %handle.id(), "failed to clean work dir: {}", e);
                return Err(SandboxError::Io(e));
            }
        }

        info!(sandbox = %handle.id(), "local sandbox released");
        Ok(())
    }

    async fn execute(
        &self,
        handle: &SandboxHandle,
        block: &CodeBlock,
    ) -> Result<ExecutionResult, SandboxError> {
        ensure_live(handle)?;

        let Some(language) = block.interpreter() else {
            return Ok(ExecutionResult::unsupported(&block.language));
        };

        let file_name = script_name(language.extension());
        let path = handle.work_dir().join(&file_name);
        tokio::fs::write(&path, &block.code).await?;

        debug!(sandbox = %handle.id(), file = %file_name, "running {}", language.interpreter());

        let child = Command::new(language.interpreter())
            .arg(&file_name)
            .current_dir(handle.work_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SandboxError::Runtime(format!("failed to spawn {}: {}", language.interpreter(), e))
            })?;

        match tokio::time::timeout(handle.timeout(), child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let exit_code = output.status.code().unwrap_or(-1);
                Ok(ExecutionResult::from_exit(
                    exit_code,
                    combine_output(&stdout, &stderr),
                ))
            }
            Ok(Err(e)) => Err(SandboxError::Io(e)),
            Err(_) => {
                warn!(sandbox = %handle.id(), "execution timed out after {:?}", handle.timeout());
                Ok(ExecutionResult::timed_out(
                    format!("Timeout: killed after {}s", handle.timeout().as_secs()),
                    handle.timeout(),
                ))
            }
        }
    }
}
