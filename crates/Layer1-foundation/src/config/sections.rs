//! Config sections
//!
//! Every field has a serde default, so a layer only names what it changes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Sandbox
// ============================================================================

/// Which execution environment backs the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxBackend {
    /// Docker container (isolated)
    #[default]
    Docker,
    /// Host process in the work dir (not isolated, development only)
    Local,
}

impl std::fmt::Display for SandboxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SandboxBackend::Docker => write!(f, "docker"),
            SandboxBackend::Local => write!(f, "local"),
        }
    }
}

/// Execution environment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxSettings {
    #[serde(default)]
    pub backend: SandboxBackend,

    /// Container image for the Docker backend
    #[serde(default = "default_image")]
    pub image: String,

    /// Host directory the sandbox is rooted at
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Upper bound for a single code execution
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pull the image when it is not present locally
    #[serde(default = "default_true")]
    pub auto_pull: bool,

    /// Grace period given to the container on stop
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            backend: SandboxBackend::default(),
            image: default_image(),
            work_dir: default_work_dir(),
            timeout_secs: default_timeout_secs(),
            auto_pull: true,
            stop_grace_secs: default_stop_grace_secs(),
        }
    }
}


// ============================================================================
// Provider
// ============================================================================

/// OpenAI-compatible chat completion endpoint used by the solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Falls back to `OPENAI_API_KEY` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
        }
    }
}


// ============================================================================
// Team
// ============================================================================

/// Turn-taking team settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSettings {
    /// Participant messages allowed before the run is stopped
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Phrase the solver uses to end the run
    #[serde(default = "default_termination_phrase")]
    pub termination_phrase: String,

    #[serde(default = "default_solver_name")]
    pub solver_name: String,

    #[serde(default = "default_executor_name")]
    pub executor_name: String,
}

impl Default for TeamSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            termination_phrase: default_termination_phrase(),
            solver_name: default_solver_name(),
            executor_name: default_executor_name(),
        }
    }
}


// ============================================================================
// Server
// ============================================================================

/// Web UI settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}


// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_IMAGE: &str = "python:3-slim";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_TURNS: usize = 10;
pub const DEFAULT_TERMINATION_PHRASE: &str = "TERMINATE";
pub const DEFAULT_SOLVER_NAME: &str = "DSA_Problem_Solver_Agent";
pub const DEFAULT_EXECUTOR_NAME: &str = "CodeExecutorAgent";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join(crate::storage::APP_DIR)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_stop_grace_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_termination_phrase() -> String {
    DEFAULT_TERMINATION_PHRASE.to_string()
}

fn default_solver_name() -> String {
    DEFAULT_SOLVER_NAME.to_string()
}

fn default_executor_name() -> String {
    DEFAULT_EXECUTOR_NAME.to_string()
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
