use std::io;

use tray_core::{ApiError, TrayError};
use tray_protocol::ErrorCode;

/// All error types for the tray-daemon crate.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("daemon not running")]
    NotRunning,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("daemon already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Config(#[from] tray_config::ConfigError),

    /// Building the backend client only fails on an unusable server URL.
    #[error("backend client error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl DaemonError {
    /// Wire error code carried in `DaemonMessage::Error`.
    pub fn wire_code(&self) -> ErrorCode {
        ErrorCode::from_code(self.error_code())
    }
}

impl TrayError for DaemonError {
    fn error_code(&self) -> &'static str {
        match self {
            DaemonError::NotRunning => "daemon_not_running",
            DaemonError::ConnectionFailed(_) => "connection_failed",
            DaemonError::ProtocolError(_) => "protocol_error",
            DaemonError::AlreadyRunning(_) => "daemon_already_running",
            DaemonError::ConfigInvalid(_) | DaemonError::Config(_) | DaemonError::Api(_) => {
                "config_invalid"
            }
            DaemonError::Io(_) => "io_error",
            DaemonError::Serde(_) => "serialization_error",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            DaemonError::AlreadyRunning(_)
                | DaemonError::ConfigInvalid(_)
                | DaemonError::Config(_)
                | DaemonError::Api(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DaemonError::AlreadyRunning(4242);
        assert_eq!(err.to_string(), "daemon already running (pid 4242)");
        assert_eq!(err.error_code(), "daemon_already_running");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_error_codes_map_to_wire_codes() {
        let cases: Vec<(DaemonError, ErrorCode)> = vec![
            (DaemonError::NotRunning, ErrorCode::DaemonNotRunning),
            (
                DaemonError::ConnectionFailed("refused".to_string()),
                ErrorCode::ConnectionFailed,
            ),
            (
                DaemonError::ProtocolError("bad json".to_string()),
                ErrorCode::ProtocolError,
            ),
            (DaemonError::AlreadyRunning(1), ErrorCode::DaemonAlreadyRunning),
            (
                DaemonError::ConfigInvalid("no url".to_string()),
                ErrorCode::ConfigInvalid,
            ),
            (
                DaemonError::Api(ApiError::InvalidRequest {
                    message: "invalid server URL".to_string(),
                }),
                ErrorCode::ConfigInvalid,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.wire_code(), expected, "{}", err);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::AddrInUse, "address in use");
        let daemon_err: DaemonError = io_err.into();
        assert_eq!(daemon_err.error_code(), "io_error");
        assert_eq!(daemon_err.wire_code(), ErrorCode::IoError);
        assert!(!daemon_err.is_user_error());
    }
}
