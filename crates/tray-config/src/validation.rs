//! Configuration validation.

use tracing::warn;

use crate::errors::ConfigError;
use crate::types::{TrayConfig, WorkerConfig};

/// Characters rejected in any value interpolated into the worker's shell
/// command. `'` is included because values are single-quoted.
pub const SHELL_UNSAFE_CHARS: &[char] = &[
    ';', '&', '|', '`', '$', '(', ')', '{', '}', '!', '<', '>', '\n', '\r', '\'',
];

/// Lower bound for the poll interval.
pub const MIN_POLL_INTERVAL_MS: u64 = 500;

/// Returns true when `value` contains none of [`SHELL_UNSAFE_CHARS`].
pub fn is_shell_safe(value: &str) -> bool {
    !value.contains(SHELL_UNSAFE_CHARS)
}

/// Find the first worker value that is not shell-safe.
///
/// Returns the environment variable name the value is configured through,
/// which is what users see in error messages.
pub fn find_unsafe_value(worker: &WorkerConfig) -> Option<&'static str> {
    let candidates: [(&'static str, Option<&str>); 5] = [
        ("TRAY_WSL_DISTRO", Some(worker.distro.as_str())),
        ("TRAY_WORKER_DIR", worker.worker_dir.as_deref()),
        ("TRAY_CONDA_SH", worker.activate_script.as_deref()),
        ("TRAY_CONDA_ENV", worker.env_name.as_deref()),
        ("TRAY_WORKER_CMD", Some(worker.command.as_str())),
    ];

    candidates
        .into_iter()
        .find(|(_, value)| value.is_some_and(|v| !is_shell_safe(v)))
        .map(|(name, _)| name)
}

/// Validate a loaded [`TrayConfig`].
///
/// # Validation Rules
///
/// - Server URL must be set and use `http://` or `https://`
/// - Poll interval must be at least [`MIN_POLL_INTERVAL_MS`]
/// - Recent jobs limit and output buffer size must be non-zero
///
/// Worker settings never fail validation. Missing paths or values with
/// shell metacharacters only make starting the worker fail; monitoring runs
/// regardless. Unsafe values are logged here so the problem shows up at
/// startup rather than on the first start request.
pub fn validate_config(config: &TrayConfig) -> Result<(), ConfigError> {
    let url = config.server.url.as_str();
    if url.is_empty() {
        return Err(ConfigError::InvalidConfiguration {
            message: "server URL is not set (use [server] url or SERVER_URL)".to_string(),
        });
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::InvalidConfiguration {
            message: format!("server URL '{}' must start with http:// or https://", url),
        });
    }

    if config.server.poll_interval_ms < MIN_POLL_INTERVAL_MS {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "poll interval {}ms is below the minimum of {}ms",
                config.server.poll_interval_ms, MIN_POLL_INTERVAL_MS
            ),
        });
    }

    if config.server.recent_jobs_limit == 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "recent_jobs_limit must be at least 1".to_string(),
        });
    }

    if config.worker.output_lines == 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "worker output_lines must be at least 1".to_string(),
        });
    }

    if let Some(name) = find_unsafe_value(&config.worker) {
        warn!(
            event = "config.worker.value_unsafe",
            variable = name,
            "worker start will be refused until this value is fixed"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> TrayConfig {
        let mut config = TrayConfig::default();
        config.server.url = "http://localhost:8000".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_url_rejected() {
        let config = TrayConfig::default();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("server URL is not set"));
    }

    #[test]
    fn test_non_http_url_rejected() {
        let mut config = valid_config();
        config.server.url = "file:///etc/passwd".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("http:// or https://"));
    }

    #[test]
    fn test_poll_interval_lower_bound() {
        let mut config = valid_config();
        config.server.poll_interval_ms = 100;
        assert!(validate_config(&config).is_err());

        config.server.poll_interval_ms = MIN_POLL_INTERVAL_MS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_is_shell_safe() {
        assert!(is_shell_safe("/home/gpu/3dify/worker"));
        assert!(is_shell_safe("Ubuntu-22.04"));
        assert!(is_shell_safe("python worker.py --preload"));
        assert!(!is_shell_safe("/tmp; rm -rf /"));
        assert!(!is_shell_safe("$(whoami)"));
        assert!(!is_shell_safe("a\nb"));
        assert!(!is_shell_safe("it's"));
    }

    #[test]
    fn test_find_unsafe_value_names_variable() {
        let mut worker = WorkerConfig {
            worker_dir: Some("/tmp; rm -rf /".to_string()),
            activate_script: Some("/opt/conda/etc/profile.d/conda.sh".to_string()),
            ..WorkerConfig::default()
        };
        assert_eq!(find_unsafe_value(&worker), Some("TRAY_WORKER_DIR"));

        worker.worker_dir = Some("/srv/worker".to_string());
        worker.env_name = Some("env`id`".to_string());
        assert_eq!(find_unsafe_value(&worker), Some("TRAY_CONDA_ENV"));

        worker.env_name = None;
        assert_eq!(find_unsafe_value(&worker), None);
    }

    #[test]
    fn test_unsafe_worker_value_does_not_fail_validation() {
        let mut config = valid_config();
        config.worker.worker_dir = Some("/tmp; rm -rf /".to_string());
        config.worker.activate_script = Some("/x && curl evil".to_string());
        assert!(validate_config(&config).is_ok());
        assert_eq!(find_unsafe_value(&config.worker), Some("TRAY_WORKER_DIR"));
    }

    #[test]
    fn test_missing_worker_paths_are_allowed() {
        let config = valid_config();
        assert!(config.worker.worker_dir.is_none());
        assert!(validate_config(&config).is_ok());
    }
}
