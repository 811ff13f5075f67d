//! Snapshot diffing.

use std::collections::HashSet;

use tray_protocol::NormalizedState;

/// A user-facing notification. Identity is `(title, body)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Dedup key.
    pub fn key(&self) -> String {
        format!("{}::{}", self.title, self.body)
    }

    pub fn login_required() -> Self {
        Self::new(
            "Login Required",
            "The 3Dify admin session expired. Run `tray login` to resume monitoring.",
        )
    }
}

/// Notifications implied by the transition `previous` -> `current`.
///
/// Rules are independent; one transition can produce several notifications.
/// `previous == None` (first tick) produces none.
pub fn detect_changes(
    previous: Option<&NormalizedState>,
    current: &NormalizedState,
) -> Vec<Notification> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let mut out = Vec::new();

    match (previous.worker_connected, current.worker_connected) {
        (true, false) => out.push(Notification::new(
            "Worker Disconnected",
            "The 3Dify worker has lost connection.",
        )),
        (false, true) => out.push(Notification::new(
            "Worker Reconnected",
            "The 3Dify worker is back online.",
        )),
        _ => {}
    }

    if current.complete > previous.complete {
        let n = current.complete - previous.complete;
        out.push(Notification::new(
            "Job Complete",
            format!(
                "{} job{} finished successfully.",
                n,
                if n > 1 { "s" } else { "" }
            ),
        ));
    }

    let previously_failed: HashSet<&str> = previous
        .recent_jobs
        .iter()
        .filter(|j| j.is_failed())
        .map(|j| j.id.as_str())
        .collect();

    for job in current
        .recent_jobs
        .iter()
        .filter(|j| j.is_failed() && !previously_failed.contains(j.id.as_str()))
    {
        let short_id: String = job.id.chars().take(8).collect();
        let body = match &job.error {
            Some(error) => format!("Job {} failed: {}", short_id, error),
            None => format!("Job {} failed", short_id),
        };
        out.push(Notification::new("Job Failed", body));
    }

    out
}
