//! GenieConfig - application settings
//!
//! Resolution order (later wins): defaults, global file, project file,
//! environment variables, command-line flags (applied by the binary).

use super::sections::{
    ProviderSettings, SandboxBackend, SandboxSettings, ServerSettings, TeamSettings,
};
use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Settings file name inside a store
pub const GENIE_CONFIG_FILE: &str = "config.json";

/// Environment variable names
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "ALGOGENIE_MODEL";
pub const ENV_WORK_DIR: &str = "ALGOGENIE_WORK_DIR";
pub const ENV_TIMEOUT: &str = "ALGOGENIE_TIMEOUT";
pub const ENV_BACKEND: &str = "ALGOGENIE_BACKEND";

/// Reserved source of the task message
const USER_SOURCE: &str = "user";

// ============================================================================
// GenieConfig
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenieConfig {
    #[serde(default)]
    pub sandbox: SandboxSettings,

    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub team: TeamSettings,

    #[serde(default)]
    pub server: ServerSettings,
}

impl GenieConfig {
    // ========================================================================
    // Load / Save
    // ========================================================================

    /// Global + project layers, then environment overrides
    pub fn load() -> Result<Self> {
        let mut layers = Vec::new();

        if let Ok(global) = JsonStore::global() {
            if let Some(layer) = global.load_optional::<Value>(GENIE_CONFIG_FILE)? {
                debug!(path = %global.file_path(GENIE_CONFIG_FILE).display(), "loaded global config");
                layers.push(layer);
            }
        }

        if let Ok(project) = JsonStore::current_project() {
            if let Some(layer) = project.load_optional::<Value>(GENIE_CONFIG_FILE)? {
                debug!(path = %project.file_path(GENIE_CONFIG_FILE).display(), "loaded project config");
                layers.push(layer);
            }
        }

        let mut config = Self::from_layers(layers)?;
        config.apply_env();
        Ok(config)
    }

    /// Load a single explicit file on top of the defaults, then environment
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let layer: Value = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        let mut config = Self::from_layers([layer])?;
        config.apply_env();
        Ok(config)
    }

    /// Build a config from JSON layers, later layers winning key by key
    ///
    /// A key present in a later layer always wins, even when its value
    /// equals the default.
    pub fn from_layers<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut merged = Value::Object(Map::new());
        for layer in layers {
            merge_json(&mut merged, layer);
        }
        serde_json::from_value(merged)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))
    }

    pub fn save_global(&self) -> Result<()> {
        let store = JsonStore::global()?;
        store.save(GENIE_CONFIG_FILE, self)
    }

    pub fn save_project(&self) -> Result<()> {
        let store = JsonStore::current_project()?;
        store.save(GENIE_CONFIG_FILE, self)
    }

    // ========================================================================
    // Overrides
    // ========================================================================

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY) {
            self.provider.api_key = Some(key);
        }
        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.provider.base_url = url;
        }
        if let Some(model) = non_empty(ENV_MODEL) {
            self.provider.model = model;
        }
        if let Some(dir) = non_empty(ENV_WORK_DIR) {
            self.sandbox.work_dir = dir.into();
        }
        if let Some(timeout) = non_empty(ENV_TIMEOUT) {
            match timeout.trim().parse::<u64>() {
                Ok(secs) => self.sandbox.timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid {}={}", ENV_TIMEOUT, timeout),
            }
        }
        if let Some(backend) = non_empty(ENV_BACKEND) {
            match backend.trim().to_ascii_lowercase().as_str() {
                "docker" => self.sandbox.backend = SandboxBackend::Docker,
                "local" => self.sandbox.backend = SandboxBackend::Local,
                other => tracing::warn!("Ignoring unknown {}={}", ENV_BACKEND, other),
            }
        }
    }

    // ========================================================================
    // Validation
    // ========================================================================

    pub fn validate(&self) -> Result<()> {
        if self.sandbox.timeout_secs == 0 {
            return Err(Error::Config("sandbox.timeoutSecs must be > 0".to_string()));
        }
        if self.sandbox.backend == SandboxBackend::Docker && self.sandbox.image.trim().is_empty()
        {
            return Err(Error::Config("sandbox.image must not be empty".to_string()));
        }
        if self.team.max_turns == 0 {
            return Err(Error::Config("team.maxTurns must be > 0".to_string()));
        }
        if self.team.termination_phrase.trim().is_empty() {
            return Err(Error::Config(
                "team.terminationPhrase must not be empty".to_string(),
            ));
        }

        let solver = self.team.solver_name.trim();
        let executor = self.team.executor_name.trim();
        if solver.is_empty() || executor.is_empty() {
            return Err(Error::Config(
                "participant names must not be empty".to_string(),
            ));
        }
        if solver == executor {
            return Err(Error::Config(
                "solver and executor must have distinct names".to_string(),
            ));
        }
        if solver == USER_SOURCE || executor == USER_SOURCE {
            return Err(Error::Config(format!(
                "'{}' is reserved for the task message",
                USER_SOURCE
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn backend(mut self, backend: SandboxBackend) -> Self {
        self.sandbox.backend = backend;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.sandbox.timeout_secs = secs;
        self
    }

    pub fn max_turns(mut self, turns: usize) -> Self {
        self.team.max_turns = turns;
        self
    }
}

/// Recursively overlay `overlay` onto `base`; objects merge, anything else replaces
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
