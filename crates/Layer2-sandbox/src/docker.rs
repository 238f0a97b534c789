//! Docker back-end via bollard
//!
//! Each sandbox is one long-lived container (`sleep infinity`) with the run's
//! scratch directory bind-mounted at `/workspace`. Code blocks are written on
//! the host and executed with `docker exec`.

use crate::code::{combine_output, CodeBlock, ExecutionResult, Language};
use crate::error::SandboxError;
use crate::handle::SandboxHandle;
use crate::manager::{ensure_live, script_name, EnvironmentManager};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use genie_foundation::SandboxSettings;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Label applied to every container this back-end creates
pub const MANAGED_LABEL: &str = "algogenie.managed";

/// Mount point of the scratch directory inside the container
pub const CONTAINER_WORKDIR: &str = "/workspace";

/// Slack on top of the in-container `timeout` before giving up on the daemon
const EXEC_GRACE: Duration = Duration::from_secs(5);

/// Container-backed execution environment
pub struct DockerEnvironment {
    docker: Docker,
    image: String,
    auto_pull: bool,
    stop_grace_secs: i64,
}

impl DockerEnvironment {
    /// Create a client for the local daemon
    ///
    /// Does not contact the daemon; connectivity is checked on `acquire`.
    pub fn connect(image: impl Into<String>) -> Result<Self, SandboxError> {
        #[cfg(unix)]
        let docker = Docker::connect_with_socket_defaults()?;

        #[cfg(windows)]
        let docker = Docker::connect_with_named_pipe_defaults()?;

        Ok(Self {
            docker,
            image: image.into(),
            auto_pull: true,
            stop_grace_secs: 5,
        })
    }

    pub fn from_settings(settings: &SandboxSettings) -> Result<Self, SandboxError> {
        Ok(Self::connect(&settings.image)?
            .with_auto_pull(settings.auto_pull)
            .with_stop_grace(settings.stop_grace_secs))
    }

    pub fn with_auto_pull(mut self, auto_pull: bool) -> Self {
        self.auto_pull = auto_pull;
        self
    }

    pub fn with_stop_grace(mut self, secs: u64) -> Self {
        self.stop_grace_secs = secs as i64;
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Make sure the image is present, pulling it if allowed
    async fn ensure_image(&self) -> Result<(), SandboxError> {
        if self.docker.inspect_image(&self.image).await.is_ok() {
            debug!("Image {} already exists locally", self.image);
            return Ok(());
        }

        if !self.auto_pull {
            return Err(SandboxError::ImageUnavailable(format!(
                "{} not found locally and pulling is disabled (docker pull {})",
                self.image, self.image
            )));
        }

        info!("Pulling image {}", self.image);
        let options = CreateImageOptions {
            from_image: self.image.clone(),
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        let mut last_status = String::new();
        while let Some(progress) = stream.next().await {
            let info = progress.map_err(|e| {
                SandboxError::ImageUnavailable(format!("failed to pull {}: {}", self.image, e))
            })?;
            if let Some(error) = info.error {
                return Err(SandboxError::ImageUnavailable(format!(
                    "failed to pull {}: {}",
                    self.image, error
                )));
            }
            if let Some(status) = info.status {
                if status != last_status {
                    debug!("Pull status: {}", status);
                    last_status = status;
                }
            }
        }

        info!("Pulled image {}", self.image);
        Ok(())
    }

    /// Idle container with the run directory mounted at `/workspace`
    fn container_config(&self, host_dir: &Path) -> Config<String> {
        let labels = HashMap::from([(MANAGED_LABEL.to_string(), "true".to_string())]);

        Config {
            image: Some(self.image.clone()),
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            working_dir: Some(CONTAINER_WORKDIR.to_string()),
            labels: Some(labels),
            tty: Some(false),
            host_config: Some(HostConfig {
                binds: Some(vec![format!("{}:{}", host_dir.display(), CONTAINER_WORKDIR)]),
                auto_remove: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    async fn create_and_start(&self, name: &str, host_dir: &Path) -> Result<String, SandboxError> {
        let config = self.container_config(host_dir);

        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| {
                error!("Failed to create container {}: {}", name, e);
                SandboxError::StartFailed(format!("failed to create container: {}", e))
            })?;

        if let Err(e) = self
            .docker
            .start_container(&response.id, None::<StartContainerOptions<String>>)
            .await
        {
            error!("Failed to start container {}: {}", response.id, e);
            // Leave nothing half-started behind.
            if let Err(cleanup) = self.remove_container(&response.id).await {
                warn!("Failed to remove container {}: {}", response.id, cleanup);
            }
            return Err(SandboxError::StartFailed(format!(
                "failed to start container: {}",
                e
            )));
        }

        Ok(response.id)
    }

    async fn stop_container(&self, container_id: &str) -> Result<(), SandboxError> {
        let options = StopContainerOptions {
            t: self.stop_grace_secs,
        };

        match self.docker.stop_container(container_id, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if daemon_status_in(&e, &[304, 404]) => {
                debug!("Container {} already stopped", container_id);
                Ok(())
            }
            Err(e) => Err(SandboxError::Docker(e)),
        }
    }

    async fn remove_container(&self, container_id: &str) -> Result<(), SandboxError> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };

        match self
            .docker
            .remove_container(container_id, Some(options))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if daemon_status_in(&e, &[404]) => {
                debug!("Container {} already removed", container_id);
                Ok(())
            }
            Err(e) => Err(SandboxError::Docker(e)),
        }
    }

    /// Run a command in the container, collecting output and exit code
    async fn exec(&self, container_id: &str, cmd: Vec<String>) -> Result<(i32, String), SandboxError> {
        let options = CreateExecOptions {
            cmd: Some(cmd),
            working_dir: Some(CONTAINER_WORKDIR.to_string()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(container_id, options)
            .await
            .map_err(|e| SandboxError::Runtime(format!("failed to create exec: {}", e)))?;

        let started = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| SandboxError::Runtime(format!("failed to start exec: {}", e)))?;

        let mut stdout = String::new();
        let mut stderr = String::new();
        if let StartExecResults::Attached { mut output, .. } = started {
            while let Some(chunk) = output.next().await {
                match chunk? {
                    LogOutput::StdOut { message } => {
                        stdout.push_str(&String::from_utf8_lossy(&message))
                    }
                    LogOutput::StdErr { message } => {
                        stderr.push_str(&String::from_utf8_lossy(&message))
                    }
                    _ => {}
                }
            }
        }

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| SandboxError::Runtime(format!("failed to inspect exec: {}", e)))?;
        let exit_code = inspect.exit_code.unwrap_or(-1) as i32;

        Ok((exit_code, combine_output(&stdout, &stderr)))
    }
}

/// Whether a daemon error carries one of `codes` as its HTTP status
fn daemon_status_in(err: &BollardError, codes: &[u16]) -> bool {
    matches!(
        err,
        BollardError::DockerResponseServerError { status_code, .. } if codes.contains(status_code)
    )
}

/// `timeout <secs>s <interpreter> <file>`, run from `/workspace`
///
/// The limit is rounded down to whole seconds, but never below one.
fn exec_command(language: Language, file_name: &str, limit: Duration) -> Vec<String> {
    vec![
        "timeout".to_string(),
        format!("{}s", limit.as_secs().max(1)),
        language.interpreter().to_string(),
        file_name.to_string(),
    ]
}

#[async_trait]
impl EnvironmentManager for DockerEnvironment {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn acquire(
        &self,
        work_dir: &Path,
        timeout: Duration,
    ) -> Result<SandboxHandle, SandboxError> {
        self.docker.ping().await.map_err(|e| {
            error!("Failed to connect to Docker daemon: {}", e);
            SandboxError::StartFailed(format!("Docker daemon unreachable: {}", e))
        })?;

        self.ensure_image().await?;

        let id = Uuid::new_v4().simple().to_string();
        let run_dir = work_dir.join(&id);
        tokio::fs::create_dir_all(&run_dir).await.map_err(|e| {
            SandboxError::StartFailed(format!("cannot create {}: {}", run_dir.display(), e))
        })?;
        // Bind mounts need an absolute host path.
        let run_dir = tokio::fs::canonicalize(&run_dir).await?;

        let name = format!("algogenie-{}", id);
        let container_id = match self.create_and_start(&name, &run_dir).await {
            Ok(container_id) => container_id,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&run_dir).await;
                return Err(e);
            }
        };

        info!(
            sandbox = %id,
            container_id = %container_id,
            image = %self.image,
            "docker sandbox started"
        );
        Ok(SandboxHandle::with_id(id, run_dir, timeout).with_container(container_id))
    }

    async fn release(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        if !handle.mark_released() {
            debug!(sandbox = %handle.id(), "already released");
            return Ok(());
        }

        let mut result = Ok(());
        if let Some(container_id) = handle.container_id() {
            if let Err(e) = self.stop_container(container_id).await {
                warn!(container_id = %container_id, "stop failed, forcing removal: {}", e);
            }
            result = self.remove_container(container_id).await;
        }

        if let Err(e) = tokio::fs::remove_dir_all(handle.work_dir()).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(sandbox = %handle.id(), "failed to clean work dir: {}", e);
            }
        }

        match &result {
            Ok(()) => info!(sandbox = %handle.id(), "docker sandbox released"),
            Err(e) => error!(sandbox = %handle.id(), "docker sandbox release failed: {}", e),
        }
        result
    }

    async fn execute(
        &self,
        handle: &SandboxHandle,
        block: &CodeBlock,
    ) -> Result<ExecutionResult, SandboxError> {
        ensure_live(handle)?;
        let container_id = handle
            .container_id()
            .ok_or_else(|| SandboxError::Runtime("handle has no container".to_string()))?;

        let Some(language) = block.interpreter() else {
            return Ok(ExecutionResult::unsupported(&block.language));
        };

        let file_name = script_name(language.extension());
        tokio::fs::write(handle.work_dir().join(&file_name), &block.code).await?;

        let limit = handle.timeout();
        let cmd = exec_command(language, &file_name, limit);
        debug!(container_id = %container_id, file = %file_name, "exec {}", cmd.join(" "));

        match tokio::time::timeout(limit + EXEC_GRACE, self.exec(container_id, cmd)).await {
            Ok(Ok((exit_code, output))) => Ok(ExecutionResult::from_timeout_wrapped_exit(
                exit_code, output, limit,
            )),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(container_id = %container_id, "exec did not return within {:?}", limit + EXEC_GRACE);
                Ok(ExecutionResult::timed_out(
                    format!("Timeout: killed after {}s", limit.as_secs()),
                    limit,
                ))
            }
        }
    }
}
