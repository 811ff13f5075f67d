//! `osascript` (Notification Center).

use std::process::Command;

use super::run_tool;
use crate::notify::errors::NotifyError;
use crate::notify::traits::NotificationBackend;

pub struct MacOsNotificationBackend;

/// Quote `s` as an AppleScript string literal.
fn applescript_string(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

impl NotificationBackend for MacOsNotificationBackend {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn is_available(&self) -> bool {
        cfg!(target_os = "macos")
    }

    fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let script = format!(
            "display notification {} with title {}",
            applescript_string(message),
            applescript_string(title)
        );

        run_tool(
            self.name(),
            "osascript",
            title,
            Command::new("osascript").arg("-e").arg(&script),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applescript_string_escapes_quotes_and_backslashes() {
        assert_eq!(
            applescript_string(r#"Job "abc" failed: C:\tmp"#),
            r#""Job \"abc\" failed: C:\\tmp""#
        );
    }

    #[test]
    fn macos_backend_only_on_macos() {
        assert_eq!(
            MacOsNotificationBackend.is_available(),
            cfg!(target_os = "macos")
        );
    }
}
