//! Configuration loading.
//!
//! # Configuration Hierarchy
//!
//! Later sources override earlier ones:
//! 1. **Hardcoded defaults**
//! 2. **User config** - `~/.3dify-tray/config.toml`. A missing file is fine;
//!    a file that fails to parse is reported and ignored.
//! 3. **`.env` file** - `~/.3dify-tray/.env`. Only consulted for variables
//!    the process environment does not already define.
//! 4. **Environment variables** - see [`ENV_VARS`].
//!
//! Loading never mutates the process environment.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use tray_paths::TrayPaths;

use crate::errors::ConfigError;
use crate::types::{ExecutionContext, TrayConfig};

/// Every environment variable consulted by [`apply_env_overrides`].
pub const ENV_VARS: &[&str] = &[
    "SERVER_URL",
    "TRAY_API_TOKEN",
    "TRAY_POLL_INTERVAL",
    "TRAY_WSL_DISTRO",
    "TRAY_WORKER_DIR",
    "TRAY_CONDA_SH",
    "TRAY_CONDA_ENV",
    "TRAY_WORKER_CMD",
    "TRAY_WORKER_CONTEXT",
];

/// Lookup of override values: process environment first, then `.env` entries.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    dotenv: HashMap<String, String>,
}

impl EnvSource {
    /// Process environment only.
    pub fn process() -> Self {
        Self::default()
    }

    /// Process environment backed by the entries of a `.env` file.
    ///
    /// A missing file yields an empty fallback. Malformed lines are logged
    /// and skipped.
    pub fn with_dotenv(path: &Path) -> Self {
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(e) if e.not_found() => {
                debug!(event = "config.dotenv.not_found", path = %path.display());
                return Self::default();
            }
            Err(e) => {
                warn!(
                    event = "config.dotenv.load_failed",
                    path = %path.display(),
                    error = %e
                );
                return Self::default();
            }
        };

        let mut dotenv = HashMap::new();
        for item in iter {
            match item {
                Ok((key, value)) => {
                    dotenv.insert(key, value);
                }
                Err(e) => {
                    warn!(
                        event = "config.dotenv.line_skipped",
                        path = %path.display(),
                        error = %e
                    );
                }
            }
        }

        debug!(
            event = "config.dotenv.loaded",
            path = %path.display(),
            count = dotenv.len()
        );
        Self { dotenv }
    }

    /// Build a source from explicit `.env`-style pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            dotenv: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Resolve `key`. Empty values count as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match std::env::var(key) {
            Ok(v) => Some(v),
            Err(_) => self.dotenv.get(key).cloned(),
        };
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Load configuration from the tray directory and the environment.
///
/// Does not validate; call [`crate::validate_config`] on the result.
///
/// # Errors
///
/// Only unexpected IO failures on the config file are errors. Parse errors
/// and malformed overrides are logged and fall back to defaults.
pub fn load_config(paths: &TrayPaths) -> Result<TrayConfig, ConfigError> {
    let config_path = paths.user_config();
    let mut config = match load_config_file(&config_path) {
        Ok(config) => config,
        Err(ConfigError::IoError { source }) if source.kind() == std::io::ErrorKind::NotFound => {
            debug!(event = "config.file.not_found", path = %config_path.display());
            TrayConfig::default()
        }
        Err(ConfigError::ConfigParseError { message }) => {
            warn!(
                event = "config.file.parse_failed",
                path = %config_path.display(),
                error = %message
            );
            TrayConfig::default()
        }
        Err(e) => return Err(e),
    };

    let env = EnvSource::with_dotenv(&paths.env_file());
    apply_env_overrides(&mut config, &env);
    config.server.url = normalize_server_url(&config.server.url);

    debug!(
        event = "config.load_completed",
        server_url = %config.server.url,
        context = %config.worker.context,
        worker_configured = config.worker.worker_dir.is_some()
            && config.worker.activate_script.is_some()
    );
    Ok(config)
}

/// Parse a single `config.toml`.
pub fn load_config_file(path: &Path) -> Result<TrayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        message: format!("{}: {}", path.display(), e),
    })
}

/// Apply the environment variables in [`ENV_VARS`] on top of `config`.
pub fn apply_env_overrides(config: &mut TrayConfig, env: &EnvSource) {
    if let Some(url) = env.get("SERVER_URL") {
        config.server.url = url;
    }
    if let Some(token) = env.get("TRAY_API_TOKEN") {
        config.server.token = Some(token);
    }
    if let Some(raw) = env.get("TRAY_POLL_INTERVAL") {
        match raw.parse::<u64>() {
            Ok(ms) => config.server.poll_interval_ms = ms,
            Err(e) => warn!(
                event = "config.env.invalid_value",
                var = "TRAY_POLL_INTERVAL",
                value = %raw,
                error = %e
            ),
        }
    }
    if let Some(distro) = env.get("TRAY_WSL_DISTRO") {
        config.worker.distro = distro;
    }
    if let Some(dir) = env.get("TRAY_WORKER_DIR") {
        config.worker.worker_dir = Some(dir);
    }
    if let Some(script) = env.get("TRAY_CONDA_SH") {
        config.worker.activate_script = Some(script);
    }
    if let Some(name) = env.get("TRAY_CONDA_ENV") {
        config.worker.env_name = Some(name);
    }
    if let Some(command) = env.get("TRAY_WORKER_CMD") {
        config.worker.command = command;
    }
    if let Some(raw) = env.get("TRAY_WORKER_CONTEXT") {
        match raw.parse::<ExecutionContext>() {
            Ok(context) => config.worker.context = context,
            Err(e) => warn!(
                event = "config.env.invalid_value",
                var = "TRAY_WORKER_CONTEXT",
                value = %raw,
                error = %e
            ),
        }
    }
}

fn normalize_server_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn clear_all() -> Vec<(&'static str, Option<&'static str>)> {
        ENV_VARS.iter().map(|k| (*k, None)).collect()
    }

    #[test]
    fn test_load_config_missing_files_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let paths = TrayPaths::from_dir(dir.path().to_path_buf());

        temp_env::with_vars(clear_all(), || {
            let config = load_config(&paths).unwrap();
            assert_eq!(config, TrayConfig::default());
        });
    }

    #[test]
    fn test_load_config_parse_error_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let paths = TrayPaths::from_dir(dir.path().to_path_buf());
        fs::write(paths.user_config(), "[server\nurl = ").unwrap();

        temp_env::with_vars(clear_all(), || {
            let config = load_config(&paths).unwrap();
            assert_eq!(config.server.poll_interval_ms, 5000);
            assert!(config.server.url.is_empty());
        });
    }

    #[test]
    fn test_load_config_file_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll = [").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_load_config_trims_trailing_slashes() {
        let dir = TempDir::new().unwrap();
        let paths = TrayPaths::from_dir(dir.path().to_path_buf());
        fs::write(
            paths.user_config(),
            "[server]\nurl = \"https://3dify.example.com//\"\n",
        )
        .unwrap();

        temp_env::with_vars(clear_all(), || {
            let config = load_config(&paths).unwrap();
            assert_eq!(config.server.url, "https://3dify.example.com");
        });
    }

    #[test]
    fn test_dotenv_fills_unset_vars_only() {
        let dir = TempDir::new().unwrap();
        let paths = TrayPaths::from_dir(dir.path().to_path_buf());
        fs::write(
            paths.env_file(),
            "SERVER_URL=http://from-dotenv:8000\nTRAY_WORKER_DIR=/home/gpu/worker\n",
        )
        .unwrap();

        let mut vars = clear_all();
        vars.retain(|(k, _)| *k != "SERVER_URL");
        vars.push(("SERVER_URL", Some("http://from-env:9000")));

        temp_env::with_vars(vars, || {
            let config = load_config(&paths).unwrap();
            assert_eq!(config.server.url, "http://from-env:9000");
            assert_eq!(
                config.worker.worker_dir.as_deref(),
                Some("/home/gpu/worker")
            );
        });
    }

    #[test]
    fn test_env_overrides_toml() {
        let dir = TempDir::new().unwrap();
        let paths = TrayPaths::from_dir(dir.path().to_path_buf());
        fs::write(
            paths.user_config(),
            "[server]\npoll_interval_ms = 2000\n[worker]\ndistro = \"Debian\"\n",
        )
        .unwrap();

        let mut vars = clear_all();
        vars.retain(|(k, _)| !matches!(*k, "TRAY_POLL_INTERVAL" | "TRAY_WORKER_CONTEXT"));
        vars.push(("TRAY_POLL_INTERVAL", Some("1500")));
        vars.push(("TRAY_WORKER_CONTEXT", Some("wsl")));

        temp_env::with_vars(vars, || {
            let config = load_config(&paths).unwrap();
            assert_eq!(config.server.poll_interval_ms, 1500);
            assert_eq!(config.worker.distro, "Debian");
            assert_eq!(config.worker.context, ExecutionContext::Wsl);
        });
    }

    #[test]
    fn test_invalid_override_keeps_previous_value() {
        let mut config = TrayConfig::default();
        let env = EnvSource::from_pairs([
            ("TRAY_POLL_INTERVAL", "fast"),
            ("TRAY_WORKER_CONTEXT", "docker"),
        ]);

        temp_env::with_vars(clear_all(), || {
            apply_env_overrides(&mut config, &env);
        });
        assert_eq!(config.server.poll_interval_ms, 5000);
        assert_eq!(config.worker.context, ExecutionContext::default());
    }

    #[test]
    fn test_empty_value_counts_as_unset() {
        let env = EnvSource::from_pairs([("TRAY_CONDA_ENV", "  ")]);
        temp_env::with_var_unset("TRAY_CONDA_ENV", || {
            assert_eq!(env.get("TRAY_CONDA_ENV"), None);
        });
    }
}
