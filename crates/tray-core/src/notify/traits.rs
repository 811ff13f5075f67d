//! Notification traits.

use super::changes::Notification;
use super::errors::NotifyError;

/// A platform mechanism for showing a desktop notification.
pub trait NotificationBackend: Send + Sync {
    /// Short identifier used in logs and tests.
    fn name(&self) -> &'static str;

    /// Whether this backend can run on the current host.
    fn is_available(&self) -> bool;

    fn send(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Final delivery step behind the [`NotificationEngine`](super::NotificationEngine).
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}
