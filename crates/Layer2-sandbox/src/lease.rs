//! RAII guard around an acquired sandbox

use crate::error::SandboxError;
use crate::handle::SandboxHandle;
use crate::manager::EnvironmentManager;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Owns a live [`SandboxHandle`] and releases it exactly once
///
/// Call [`SandboxLease::release`] on the normal path. If the lease is dropped
/// without that (panic, aborted task), the release is spawned onto the
/// current tokio runtime.
pub struct SandboxLease {
    manager: Arc<dyn EnvironmentManager>,
    handle: SandboxHandle,
    released: bool,
}

impl SandboxLease {
    /// Acquire a sandbox and wrap it
    pub async fn acquire(
        manager: Arc<dyn EnvironmentManager>,
        work_dir: &Path,
        timeout: Duration,
    ) -> Result<Self, SandboxError> {
        let handle = manager.acquire(work_dir, timeout).await?;
        debug!(sandbox = %handle.id(), backend = manager.name(), "sandbox leased");
        Ok(Self {
            manager,
            handle,
            released: false,
        })
    }

    pub fn handle(&self) -> &SandboxHandle {
        &self.handle
    }

    pub fn manager(&self) -> &Arc<dyn EnvironmentManager> {
        &self.manager
    }

    /// Release the sandbox now
    pub async fn release(mut self) -> Result<(), SandboxError> {
        self.released = true;
        self.manager.release(&self.handle).await
    }
}

impl Drop for SandboxLease {
    fn drop(&mut self) {
        if self.released || self.handle.is_released() {
            return;
        }
        self.released = true;

        let manager = Arc::clone(&self.manager);
        let handle = self.handle.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(sandbox = %handle.id(), "lease dropped unreleased, releasing in background");
                runtime.spawn(async move {
                    if let Err(e) = manager.release(&handle).await {
                        warn!(sandbox = %handle.id(), "background release failed: {}", e);
                    }
                });
            }
            Err(_) => {
                warn!(sandbox = %handle.id(), "no runtime available, sandbox leaked");
            }
        }
    }
}
