use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::changes::Notification;
use super::dedup::NotificationDeduper;
use super::traits::Notifier;
use crate::errors::TrayError;

/// Dedup plus best-effort delivery. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct NotificationEngine {
    enabled: bool,
    deduper: Arc<Mutex<NotificationDeduper>>,
    notifier: Arc<dyn Notifier>,
}

impl NotificationEngine {
    pub fn new(notifier: Arc<dyn Notifier>, window: Duration, enabled: bool) -> Self {
        Self {
            enabled,
            deduper: Arc::new(Mutex::new(NotificationDeduper::new(window))),
            notifier,
        }
    }

    /// Deliver `notification` unless it repeats one sent within the window.
    ///
    /// Returns whether it was forwarded to the notifier (delivery itself may
    /// still have failed; that is logged only).
    pub fn notify(&self, notification: &Notification) -> bool {
        self.notify_at(notification, Instant::now())
    }

    pub fn notify_at(&self, notification: &Notification, now: Instant) -> bool {
        if !self.enabled {
            return false;
        }

        let key = notification.key();
        let fresh = self
            .deduper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .should_send(&key, now);

        if !fresh {
            debug!(
                event = "core.notify.send_suppressed",
                title = %notification.title
            );
            return false;
        }

        info!(
            event = "core.notify.send_started",
            title = %notification.title,
            body = %notification.body
        );
        match self.notifier.notify(notification) {
            Ok(()) => info!(
                event = "core.notify.send_completed",
                title = %notification.title
            ),
            Err(e) => warn!(
                event = "core.notify.send_failed",
                backend = e.backend(),
                code = e.error_code(),
                title = %e.title(),
                error = %e
            ),
        }
        true
    }

    pub fn notify_all(&self, notifications: &[Notification]) {
        let now = Instant::now();
        for notification in notifications {
            self.notify_at(notification, now);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;
    use crate::notify::errors::NotifyError;

    /// Records every notification it receives.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Notification>>,
        pub fail: bool,
    }

    impl RecordingNotifier {
        pub fn titles(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.title.clone())
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(notification.clone());
            if self.fail {
                return Err(NotifyError::Rejected {
                    backend: "recording",
                    title: notification.title.clone(),
                    reason: "told to fail".to_string(),
                });
            }
            Ok(())
        }
    }
}
