//! Application wiring: config -> provider + environment manager -> team

use genie_agent::{Classifier, Orchestrator};
use genie_foundation::{GenieConfig, Result, SandboxBackend};
use genie_provider::{OpenAiProvider, Provider};
use genie_sandbox::{DockerEnvironment, EnvironmentManager, LocalEnvironment};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a run needs, shared by the web server and the CLI
#[derive(Clone)]
pub struct App {
    pub config: Arc<GenieConfig>,
    pub team: Orchestrator,
    pub classifier: Classifier,
}

impl App {
    pub fn build(config: GenieConfig) -> Result<Self> {
        let provider = build_provider(&config)?;
        let manager = build_manager(&config)?;
        Ok(Self::with_parts(config, provider, manager))
    }

    /// Wire a team from explicit parts
    pub fn with_parts(
        config: GenieConfig,
        provider: Arc<dyn Provider>,
        manager: Arc<dyn EnvironmentManager>,
    ) -> Self {
        let team = Orchestrator::from_config(&config, provider, manager);
        let classifier = Classifier::new(team.solver_name(), team.executor_name());
        Self {
            config: Arc::new(config),
            team,
            classifier,
        }
    }
}

fn build_provider(config: &GenieConfig) -> Result<Arc<dyn Provider>> {
    let settings = &config.provider;
    let api_key = settings.api_key.clone().unwrap_or_default();
    if api_key.trim().is_empty() {
        warn!("No API key configured; runs will fail until OPENAI_API_KEY is set");
    }

    let provider = OpenAiProvider::new(api_key, &settings.model, settings.max_tokens)?
        .with_base_url(&settings.base_url);
    info!(model = %settings.model, "provider ready");
    Ok(Arc::new(provider))
}

fn build_manager(config: &GenieConfig) -> Result<Arc<dyn EnvironmentManager>> {
    let manager: Arc<dyn EnvironmentManager> = match config.sandbox.backend {
        SandboxBackend::Docker => Arc::new(DockerEnvironment::from_settings(&config.sandbox)?),
        SandboxBackend::Local => Arc::new(LocalEnvironment::new()),
    };
    info!(
        backend = manager.name(),
        work_dir = %config.sandbox.work_dir.display(),
        "environment manager ready"
    );
    Ok(manager)
}
