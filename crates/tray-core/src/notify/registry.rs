//! Notification registry for managing and looking up notification backends.

use std::sync::LazyLock;

use tracing::debug;

use super::backends::{LinuxNotificationBackend, MacOsNotificationBackend};
use super::errors::NotifyError;
use super::traits::NotificationBackend;

/// Global registry of all supported notification backends.
static REGISTRY: LazyLock<NotificationRegistry> = LazyLock::new(NotificationRegistry::new);

struct NotificationRegistry {
    backends: Vec<Box<dyn NotificationBackend>>,
}

impl NotificationRegistry {
    fn new() -> Self {
        Self {
            backends: vec![
                Box::new(MacOsNotificationBackend),
                Box::new(LinuxNotificationBackend),
            ],
        }
    }

    /// First backend, in registration order, that is available on this host.
    fn detect(&self) -> Option<&dyn NotificationBackend> {
        self.backends
            .iter()
            .find(|b| b.is_available())
            .map(|b| b.as_ref())
    }
}

/// Send via the first available platform backend.
///
/// Returns `Ok(false)` when no backend is available.
pub fn send_via_backend(title: &str, message: &str) -> Result<bool, NotifyError> {
    let Some(backend) = REGISTRY.detect() else {
        debug!(
            event = "core.notify.send_skipped",
            reason = "no backend available",
        );
        return Ok(false);
    };

    debug!(event = "core.notify.backend_selected", backend = backend.name());
    backend.send(title, message)?;
    Ok(true)
}
