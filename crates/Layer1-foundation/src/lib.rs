//! # genie-foundation
//!
//! Foundation layer for AlgoGenie:
//! - Error: shared `Error` / `Result`, every upper layer converts into it
//! - Config: `GenieConfig` (sandbox, provider, team, server)
//! - Storage: `JsonStore` for global (`<config_dir>/algogenie`) and project
//!   (`.algogenie/`) settings files

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    GenieConfig, ProviderSettings, SandboxBackend, SandboxSettings, ServerSettings, TeamSettings,
    GENIE_CONFIG_FILE,
};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{JsonStore, APP_DIR};
