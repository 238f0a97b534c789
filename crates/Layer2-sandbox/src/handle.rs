//! Handle to a live sandbox

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Opaque reference to one started execution context
///
/// Clones share the released flag, so whoever releases first wins and every
/// clone observes it.
#[derive(Debug, Clone)]
pub struct SandboxHandle {
    id: String,
    work_dir: PathBuf,
    timeout: Duration,
    container_id: Option<String>,
    released: Arc<AtomicBool>,
}

impl SandboxHandle {
    pub fn new(work_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::with_id(Uuid::new_v4().simple().to_string(), work_dir, timeout)
    }

    pub fn with_id(id: impl Into<String>, work_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            id: id.into(),
            work_dir: work_dir.into(),
            timeout,
            container_id: None,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Host directory scripts are written to
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Per-execution time limit
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Flip the released flag; returns `true` only for the first caller
    pub fn mark_released(&self) -> bool {
        !self.released.swap(true, Ordering::AcqRel)
    }
}
