//! What a tray icon, tooltip, or status command shows for a snapshot.

use serde::{Deserialize, Serialize};
use tray_protocol::NormalizedState;

/// Icon colour for the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrayStatus {
    Green,
    Orange,
    Red,
    Grey,
}

impl TrayStatus {
    /// `None` means no snapshot has been published yet.
    pub fn from_state(state: Option<&NormalizedState>) -> Self {
        match state {
            None => TrayStatus::Red,
            Some(s) if !s.worker_connected => TrayStatus::Red,
            Some(s) if s.paused => TrayStatus::Grey,
            Some(s) if s.processing > 0 => TrayStatus::Orange,
            Some(_) => TrayStatus::Green,
        }
    }
}

impl std::fmt::Display for TrayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrayStatus::Green => write!(f, "green"),
            TrayStatus::Orange => write!(f, "orange"),
            TrayStatus::Red => write!(f, "red"),
            TrayStatus::Grey => write!(f, "grey"),
        }
    }
}

/// One-line summary, e.g. `3Dify — 2 jobs processing — GPU 65°C`.
pub fn tooltip(state: Option<&NormalizedState>) -> String {
    let Some(state) = state else {
        return "3Dify Monitor — connecting...".to_string();
    };

    let mut parts = vec!["3Dify".to_string()];

    if !state.worker_connected {
        parts.push("Worker disconnected".to_string());
    } else if state.paused {
        parts.push("Paused".to_string());
    } else if state.processing > 0 {
        parts.push(format!(
            "{} job{} processing",
            state.processing,
            plural(state.processing)
        ));
    } else {
        parts.push("Idle".to_string());
    }

    if let Some(temp) = state.gpu_temp {
        parts.push(format!("GPU {}°C", temp));
    }

    parts.join(" — ")
}

/// Detail lines: worker, GPU (when connected and known), queue.
pub fn status_lines(state: Option<&NormalizedState>) -> Vec<String> {
    let mut lines = Vec::new();

    let connected = state.is_some_and(|s| s.worker_connected);
    match state {
        Some(s) if s.worker_connected => match &s.gpu_name {
            Some(name) => lines.push(format!("Worker: Connected ({})", name)),
            None => lines.push("Worker: Connected".to_string()),
        },
        _ => lines.push("Worker: Disconnected".to_string()),
    }

    if let Some(s) = state
        && connected
        && let Some(free) = s.gpu_vram_free
    {
        lines.push(format!(
            "GPU: {}GB free, {}°C, {}%",
            free,
            s.gpu_temp.map_or("?".to_string(), |t| t.to_string()),
            s.gpu_util.map_or("?".to_string(), |u| u.to_string()),
        ));
    }

    let (pending, processing) = state.map_or((0, 0), |s| (s.pending, s.processing));
    lines.push(format!(
        "Queue: {} pending, {} processing",
        pending, processing
    ));

    lines
}

fn plural(n: u64) -> &'static str {
    if n == 1 { "" } else { "s" }
}
