//! # tray-config
//!
//! Configuration types, loading, and validation for the tray supervisor.
//!
//! Settings come from `~/.3dify-tray/config.toml`, then a `.env` file, then
//! the process environment (highest priority). See [`load_config`] for the exact
//! order and the recognised variables.

mod loading;
mod validation;

pub mod errors;
pub mod types;

// Public API re-exports
pub use errors::ConfigError;
pub use loading::{ENV_VARS, EnvSource, apply_env_overrides, load_config, load_config_file};
pub use types::{ExecutionContext, NotificationConfig, ServerConfig, TrayConfig, WorkerConfig};
pub use validation::{
    MIN_POLL_INTERVAL_MS, SHELL_UNSAFE_CHARS, find_unsafe_value, is_shell_safe, validate_config,
};

impl TrayConfig {
    /// Load configuration from `~/.3dify-tray/` and the environment.
    ///
    /// See [`loading::load_config`] for details.
    pub fn load(paths: &tray_paths::TrayPaths) -> Result<Self, ConfigError> {
        loading::load_config(paths)
    }

    /// Validate the configuration.
    ///
    /// See [`validation::validate_config`] for details.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_config(self)
    }
}
