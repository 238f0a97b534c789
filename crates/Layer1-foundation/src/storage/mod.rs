//! Storage module for AlgoGenie
//!
//! - `json`: JSON file store for settings (global + per-project)

mod json;

pub use json::{JsonStore, APP_DIR};
