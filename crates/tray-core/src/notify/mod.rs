//! Change detection and desktop notification dispatch.
//!
//! The poller hands each snapshot diff to [`detect_changes`], then the
//! resulting [`Notification`]s go through a [`NotificationEngine`], which
//! suppresses repeats inside the dedup window and forwards the rest to a
//! [`Notifier`]. Delivery is best-effort: failures are logged but never
//! propagate.

pub mod backends;
pub mod changes;
pub mod dedup;
pub mod engine;
pub mod errors;
pub mod registry;
pub mod traits;

pub use changes::{Notification, detect_changes};
pub use dedup::NotificationDeduper;
pub use engine::NotificationEngine;
pub use errors::NotifyError;
pub use traits::{NotificationBackend, Notifier};

/// [`Notifier`] that shows platform-native desktop notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        registry::send_via_backend(&notification.title, &notification.body).map(|_| ())
    }
}
