use crate::errors::TrayError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker is already running")]
    AlreadyRunning,

    #[error("Worker is not running")]
    NotRunning,

    #[error("Worker not configured. Set TRAY_WORKER_DIR and TRAY_CONDA_SH in .env")]
    NotConfigured,

    #[error("{name} contains unsafe characters")]
    UnsafeValue { name: &'static str },

    #[error("Failed to start worker: {message}")]
    SpawnFailed { message: String },

    #[error("Failed to signal worker: {message}")]
    SignalFailed { message: String },
}

impl TrayError for WorkerError {
    fn error_code(&self) -> &'static str {
        match self {
            WorkerError::AlreadyRunning => "WORKER_ALREADY_RUNNING",
            WorkerError::NotRunning => "WORKER_NOT_RUNNING",
            WorkerError::NotConfigured => "WORKER_NOT_CONFIGURED",
            WorkerError::UnsafeValue { .. } => "WORKER_INJECTION_REJECTED",
            WorkerError::SpawnFailed { .. } => "WORKER_SPAWN_FAILED",
            WorkerError::SignalFailed { .. } => "WORKER_SIGNAL_FAILED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            WorkerError::AlreadyRunning
                | WorkerError::NotRunning
                | WorkerError::NotConfigured
                | WorkerError::UnsafeValue { .. }
        )
    }
}
