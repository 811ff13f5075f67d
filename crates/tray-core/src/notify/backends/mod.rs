mod linux;
mod macos;

pub use linux::LinuxNotificationBackend;
pub use macos::MacOsNotificationBackend;

use std::process::Command;

use super::errors::NotifyError;

/// Run a notification tool to completion, mapping spawn failures and
/// non-zero exits onto the notification being shown.
fn run_tool(
    backend: &'static str,
    tool: &'static str,
    title: &str,
    command: &mut Command,
) -> Result<(), NotifyError> {
    let output = command
        .output()
        .map_err(|e| NotifyError::launch(backend, tool, title, e))?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(NotifyError::Rejected {
        backend,
        title: title.to_string(),
        reason: format!("{}: {}", output.status, stderr.trim()),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_tool_missing_binary() {
        let err = run_tool(
            "linux",
            "notify-send",
            "Job Failed",
            &mut Command::new("tray-test-no-such-notifier"),
        )
        .unwrap_err();
        assert!(matches!(err, NotifyError::ToolMissing { .. }));
        assert_eq!(err.title(), "Job Failed");
    }

    #[test]
    fn test_run_tool_nonzero_exit_is_rejected() {
        let err = run_tool("linux", "notify-send", "GPU Hot", &mut Command::new("false"))
            .unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { .. }));
        assert_eq!(err.backend(), "linux");
    }

    #[test]
    fn test_run_tool_success() {
        assert!(run_tool("linux", "notify-send", "Idle", &mut Command::new("true")).is_ok());
    }
}
