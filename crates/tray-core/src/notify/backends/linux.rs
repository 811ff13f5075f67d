//! `notify-send` (libnotify).

use std::process::Command;

use super::run_tool;
use crate::notify::errors::NotifyError;
use crate::notify::traits::NotificationBackend;

pub struct LinuxNotificationBackend;

impl NotificationBackend for LinuxNotificationBackend {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn is_available(&self) -> bool {
        cfg!(target_os = "linux") && which::which("notify-send").is_ok()
    }

    fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        run_tool(
            self.name(),
            "notify-send",
            title,
            Command::new("notify-send")
                .arg("--app-name=3Dify")
                .arg(title)
                .arg(message),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_backend_availability_matches_platform() {
        let backend = LinuxNotificationBackend;
        if !cfg!(target_os = "linux") {
            assert!(!backend.is_available());
        }
    }
}
