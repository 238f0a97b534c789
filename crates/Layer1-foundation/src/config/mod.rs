//! Config - application settings
//!
//! - `sections.rs` - sandbox / provider / team / server sections
//! - `genie.rs` - GenieConfig: load, merge, environment overrides, validation

mod genie;
mod sections;

pub use genie::{
    GenieConfig, ENV_API_KEY, ENV_BACKEND, ENV_BASE_URL, ENV_MODEL, ENV_TIMEOUT, ENV_WORK_DIR,
    GENIE_CONFIG_FILE,
};
pub use sections::{
    ProviderSettings, SandboxBackend, SandboxSettings, ServerSettings, TeamSettings,
    DEFAULT_BASE_URL, DEFAULT_BIND, DEFAULT_EXECUTOR_NAME, DEFAULT_IMAGE, DEFAULT_MAX_TURNS,
    DEFAULT_MODEL, DEFAULT_SOLVER_NAME, DEFAULT_TERMINATION_PHRASE, DEFAULT_TIMEOUT_SECS,
};
