//! Configuration types.
//!
//! All sections default sensibly so an empty or missing `config.toml` yields
//! a usable configuration; only the server URL and the worker paths have no
//! meaningful default.

use serde::{Deserialize, Serialize};

/// Top-level configuration, one field per `config.toml` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// `[server]`: the backend being monitored.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the backend, e.g. `https://3dify.example.com`.
    #[serde(default)]
    pub url: String,

    /// Bearer token for the admin API. Kept in memory only by the daemon.
    #[serde(default)]
    pub token: Option<String>,

    /// Poll interval in milliseconds. Default: 5000.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of recent jobs requested and kept in each snapshot. Default: 5.
    #[serde(default = "default_recent_jobs_limit")]
    pub recent_jobs_limit: usize,
}

// Manual Debug so the token never reaches logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("recent_jobs_limit", &self.recent_jobs_limit)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: None,
            poll_interval_ms: default_poll_interval_ms(),
            recent_jobs_limit: default_recent_jobs_limit(),
        }
    }
}

/// Where the worker process actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionContext {
    /// Inside a WSL distribution, reached via `wsl -d <distro> -- bash -c ...`.
    Wsl,
    /// Directly via `bash -c ...` on this host.
    Local,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        if cfg!(windows) {
            ExecutionContext::Wsl
        } else {
            ExecutionContext::Local
        }
    }
}

impl std::str::FromStr for ExecutionContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wsl" => Ok(ExecutionContext::Wsl),
            "local" => Ok(ExecutionContext::Local),
            other => Err(format!(
                "unknown execution context '{}' (expected 'wsl' or 'local')",
                other
            )),
        }
    }
}

impl std::fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionContext::Wsl => write!(f, "wsl"),
            ExecutionContext::Local => write!(f, "local"),
        }
    }
}

/// `[worker]`: the local GPU worker process.
///
/// Paths are strings rather than `PathBuf`: they are interpreted inside the
/// execution context, which may not share the host's path syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub context: ExecutionContext,

    /// WSL distribution name. Ignored for `local`.
    #[serde(default = "default_distro")]
    pub distro: String,

    /// Directory the worker runs from.
    #[serde(default)]
    pub worker_dir: Option<String>,

    /// Script sourced to make `conda` available (e.g. `~/miniconda3/etc/profile.d/conda.sh`).
    #[serde(default)]
    pub activate_script: Option<String>,

    /// Conda environment to activate. `None` skips `conda activate`.
    #[serde(default = "default_env_name")]
    pub env_name: Option<String>,

    /// Command exec'd as the final step. Also the orphan-sweep pattern.
    #[serde(default = "default_worker_command")]
    pub command: String,

    /// Seconds between the graceful signal and the forced kill. Default: 5.
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,

    /// Captured output lines kept in memory. Default: 200.
    #[serde(default = "default_output_lines")]
    pub output_lines: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            context: ExecutionContext::default(),
            distro: default_distro(),
            worker_dir: None,
            activate_script: None,
            env_name: default_env_name(),
            command: default_worker_command(),
            stop_grace_secs: default_stop_grace_secs(),
            output_lines: default_output_lines(),
        }
    }
}

/// `[notifications]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Identical notifications inside this window are suppressed. Default: 30.
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dedup_window_secs: default_dedup_window_secs(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_recent_jobs_limit() -> usize {
    5
}

fn default_distro() -> String {
    "Ubuntu-22.04".to_string()
}

fn default_env_name() -> Option<String> {
    Some("hunyuan3d".to_string())
}

fn default_worker_command() -> String {
    "python worker.py --preload".to_string()
}

fn default_stop_grace_secs() -> u64 {
    5
}

fn default_output_lines() -> usize {
    200
}

fn default_true() -> bool {
    true
}

fn default_dedup_window_secs() -> u64 {
    30
}
