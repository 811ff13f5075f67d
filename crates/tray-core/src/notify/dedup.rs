use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Suppresses identical notifications inside a sliding window.
#[derive(Debug)]
pub struct NotificationDeduper {
    window: Duration,
    last_sent: HashMap<String, Instant>,
}

impl NotificationDeduper {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: HashMap::new(),
        }
    }

    /// Returns true (and records `now`) when `key` has not been sent within
    /// the window. Expired entries are swept on every call.
    pub fn should_send(&mut self, key: &str, now: Instant) -> bool {
        let window = self.window;
        self.last_sent
            .retain(|_, sent| now.saturating_duration_since(*sent) < window);

        if self.last_sent.contains_key(key) {
            return false;
        }
        self.last_sent.insert(key.to_string(), now);
        true
    }

    pub fn len(&self) -> usize {
        self.last_sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_sent.is_empty()
    }
}
