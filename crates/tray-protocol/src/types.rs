use serde::{Deserialize, Serialize};

/// Backend job lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Assigned,
    Processing,
    Complete,
    Failed,
    Expired,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Assigned => write!(f, "assigned"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Complete => write!(f, "complete"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Expired => write!(f, "expired"),
            JobStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// One entry of the recent-jobs list carried in every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecentJob {
    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }
}

/// Canonical view of backend and local worker health, produced once per poll tick.
///
/// Snapshots are values: the poller builds a fresh one every tick and
/// publishes clones. `Default` is the "empty" snapshot used when a tick fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedState {
    pub worker_connected: bool,
    pub paused: bool,
    pub gpu_name: Option<String>,
    pub gpu_temp: Option<f64>,
    pub gpu_util: Option<f64>,
    pub gpu_vram_total: Option<f64>,
    pub gpu_vram_used: Option<f64>,
    pub gpu_vram_free: Option<f64>,
    pub pending: u64,
    pub processing: u64,
    pub complete: u64,
    pub failed: u64,
    /// Most recent first.
    pub recent_jobs: Vec<RecentJob>,
    pub local_worker_running: bool,
    /// Set only when the tick that produced this snapshot failed.
    pub error: Option<String>,
}

impl NormalizedState {
    /// Degraded snapshot for a tick whose fetch failed.
    pub fn failed_tick(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Whether the daemon's poller is currently producing snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingStatus {
    Active,
    /// Stopped after a 401; waiting for a new token.
    AuthRequired,
    Stopped,
}

impl std::fmt::Display for PollingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollingStatus::Active => write!(f, "active"),
            PollingStatus::AuthRequired => write!(f, "auth_required"),
            PollingStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Local worker process state as reported over IPC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Captured stdout/stderr lines, oldest first.
    #[serde(default)]
    pub output: Vec<String>,
}

/// Outcome of a user-initiated action (pause, resume, start/stop worker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

impl<E: std::fmt::Display> From<Result<(), E>> for ActionResult {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_unknown_fallback() {
        let status: JobStatus = serde_json::from_str(r#""cancelled""#).unwrap();
        assert_eq!(status, JobStatus::Unknown);

        let status: JobStatus = serde_json::from_str(r#""failed""#).unwrap();
        assert_eq!(status, JobStatus::Failed);
    }

    #[test]
    fn test_failed_tick_is_disconnected_with_error() {
        let state = NormalizedState::failed_tick("connection refused");
        assert!(!state.worker_connected);
        assert_eq!(state.error.as_deref(), Some("connection refused"));
        assert_eq!(state.pending, 0);
        assert!(state.recent_jobs.is_empty());
    }

    #[test]
    fn test_recent_job_error_omitted_when_none() {
        let job = RecentJob {
            id: "abc".to_string(),
            status: JobStatus::Complete,
            error: None,
        };
        let json = serde_json::to_string(&job).unwrap();
        assert_eq!(json, r#"{"id":"abc","status":"complete"}"#);
    }

    #[test]
    fn test_action_result_from_result() {
        let ok: ActionResult = Ok::<(), String>(()).into();
        assert!(ok.ok);
        assert!(ok.error.is_none());

        let failed: ActionResult = Err::<(), _>("Worker is not running").into();
        assert!(!failed.ok);
        assert_eq!(failed.error.as_deref(), Some("Worker is not running"));
    }

    #[test]
    fn test_polling_status_wire_format() {
        let json = serde_json::to_string(&PollingStatus::AuthRequired).unwrap();
        assert_eq!(json, r#""auth_required""#);
    }
}
