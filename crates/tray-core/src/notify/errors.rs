//! Notification delivery failures.
//!
//! Every variant names the backend that was tried and the title of the
//! notification that did not reach the desktop, so a `core.notify.send_failed`
//! log line is enough to tell which alert the user missed.

use crate::errors::TrayError;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("{backend}: '{tool}' is not installed, \"{title}\" not shown")]
    ToolMissing {
        backend: &'static str,
        tool: &'static str,
        title: String,
    },

    #[error("{backend}: could not run '{tool}' for \"{title}\": {source}")]
    LaunchFailed {
        backend: &'static str,
        tool: &'static str,
        title: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{backend}: \"{title}\" rejected ({reason})")]
    Rejected {
        backend: &'static str,
        title: String,
        reason: String,
    },
}

impl NotifyError {
    /// Backend that produced the error.
    pub fn backend(&self) -> &'static str {
        match self {
            NotifyError::ToolMissing { backend, .. }
            | NotifyError::LaunchFailed { backend, .. }
            | NotifyError::Rejected { backend, .. } => backend,
        }
    }

    /// Title of the notification that was not delivered.
    pub fn title(&self) -> &str {
        match self {
            NotifyError::ToolMissing { title, .. }
            | NotifyError::LaunchFailed { title, .. }
            | NotifyError::Rejected { title, .. } => title,
        }
    }

    /// Map a failed spawn of `tool`; a missing binary is reported separately
    /// because it is fixed by installing something, not by retrying.
    pub(crate) fn launch(
        backend: &'static str,
        tool: &'static str,
        title: &str,
        source: std::io::Error,
    ) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            NotifyError::ToolMissing {
                backend,
                tool,
                title: title.to_string(),
            }
        } else {
            NotifyError::LaunchFailed {
                backend,
                tool,
                title: title.to_string(),
                source,
            }
        }
    }
}

impl TrayError for NotifyError {
    fn error_code(&self) -> &'static str {
        match self {
            NotifyError::ToolMissing { .. } => "NOTIFY_TOOL_MISSING",
            NotifyError::LaunchFailed { .. } => "NOTIFY_LAUNCH_FAILED",
            NotifyError::Rejected { .. } => "NOTIFY_REJECTED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, NotifyError::ToolMissing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_becomes_tool_missing() {
        let error = NotifyError::launch(
            "linux",
            "notify-send",
            "Job Failed",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(error, NotifyError::ToolMissing { .. }));
        assert_eq!(
            error.to_string(),
            "linux: 'notify-send' is not installed, \"Job Failed\" not shown"
        );
        assert_eq!(error.error_code(), "NOTIFY_TOOL_MISSING");
        assert!(error.is_user_error());
    }

    #[test]
    fn test_other_spawn_errors_keep_source() {
        let error = NotifyError::launch(
            "macos",
            "osascript",
            "Worker Disconnected",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(error.error_code(), "NOTIFY_LAUNCH_FAILED");
        assert!(std::error::Error::source(&error).is_some());
        assert!(!error.is_user_error());
    }

    #[test]
    fn test_accessors_report_backend_and_title() {
        let error = NotifyError::Rejected {
            backend: "linux",
            title: "GPU Hot".to_string(),
            reason: "exit status: 1: no bus".to_string(),
        };
        assert_eq!(error.backend(), "linux");
        assert_eq!(error.title(), "GPU Hot");
        assert_eq!(error.error_code(), "NOTIFY_REJECTED");
    }
}
