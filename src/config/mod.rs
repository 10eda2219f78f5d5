//! Configuration loading and the runtime configuration context.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Deep merging in [`merger`]
//! - Feature queries during a run in [`context`]
//!
//! # Example
//!
//! ```
//! use orchestrate::config::load_merged_config;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".orchestrate");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("config.yml"), "settings:\n  max_concurrency: 2\n").unwrap();
//!
//! let config = load_merged_config(temp.path()).unwrap();
//! assert_eq!(config.settings.max_concurrency, 2);
//! ```
//!
//! # Configuration File Locations
//!
//! Layers are deep-merged in this order:
//! 1. User global config (`~/.orchestrate/config.yml`)
//! 2. Project config (`.orchestrate/config.yml`)
//! 3. Local overrides (`.orchestrate/config.local.yml`)

pub mod context;
pub mod loader;
pub mod merger;
pub mod schema;

pub use context::{apply_env_overrides, ConfigContext, ProfileContext, FEATURE_ENV_PREFIX};
pub use loader::{
    find_project_root, load_config, load_config_file, load_config_value, load_merged_config,
    local_config_path, project_config_path, ConfigPaths, CONFIG_DIR,
};
pub use merger::{deep_merge, merge_configs, set_path};
pub use schema::{OrchestrateConfig, ProfileConfig, Settings};
