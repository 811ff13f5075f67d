use clap::ArgMatches;
use serde::Serialize;
use tracing::{error, info};
use tray_core::state::{TrayStatus, status_lines, tooltip};
use tray_protocol::{ClientMessage, DaemonMessage, NormalizedState, PollingStatus};

use super::helpers::{report_ipc_error, request_id, send_request, unexpected_response};

#[derive(Serialize)]
struct StatusOutput {
    status: TrayStatus,
    polling: PollingStatus,
    tooltip: String,
    state: Option<NormalizedState>,
}

pub(crate) fn handle_status_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");
    info!(event = "cli.status_started", json_output = json_output);

    let request = ClientMessage::GetState { id: request_id() };
    let response = match send_request(&request, None) {
        Ok(response) => response,
        Err(e) => {
            report_ipc_error("get status", &e);
            error!(event = "cli.status_failed", error = %e);
            return Err(e.into());
        }
    };

    let (polling, state) = match response {
        DaemonMessage::State { polling, state, .. } => (polling, state),
        other => return Err(unexpected_response(&other)),
    };

    if json_output {
        let output = StatusOutput {
            status: TrayStatus::from_state(state.as_ref()),
            polling,
            tooltip: tooltip(state.as_ref()),
            state,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for line in render_status(polling, state.as_ref()) {
            println!("{}", line);
        }
    }

    info!(event = "cli.status_completed", polling = %polling);
    Ok(())
}

fn render_status(polling: PollingStatus, state: Option<&NormalizedState>) -> Vec<String> {
    let mut lines = vec![
        tooltip(state),
        format!("Status: {}", TrayStatus::from_state(state)),
    ];
    lines.extend(status_lines(state));

    match polling {
        PollingStatus::Active => {}
        PollingStatus::AuthRequired => {
            lines.push("Polling: stopped, login required".to_string());
            lines.push("Run: tray login --token <TOKEN>".to_string());
        }
        PollingStatus::Stopped => lines.push("Polling: stopped".to_string()),
    }

    let Some(state) = state else {
        return lines;
    };

    lines.push(format!(
        "Jobs: {} complete, {} failed",
        state.complete, state.failed
    ));
    lines.push(format!(
        "Local worker: {}",
        if state.local_worker_running {
            "running"
        } else {
            "stopped"
        }
    ));

    if !state.recent_jobs.is_empty() {
        lines.push("Recent jobs:".to_string());
        for job in &state.recent_jobs {
            let short_id: String = job.id.chars().take(8).collect();
            match &job.error {
                Some(err) => lines.push(format!("  {}  {}  {}", short_id, job.status, err)),
                None => lines.push(format!("  {}  {}", short_id, job.status)),
            }
        }
    }

    if let Some(err) = &state.error {
        lines.push(format!("Last poll failed: {}", err));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tray_protocol::{JobStatus, RecentJob};

    #[test]
    fn test_render_without_snapshot() {
        let lines = render_status(PollingStatus::Active, None);
        assert_eq!(lines[0], "3Dify Monitor — connecting...");
        assert_eq!(lines[1], "Status: red");
        assert!(lines.contains(&"Worker: Disconnected".to_string()));
    }

    #[test]
    fn test_render_auth_required_hint() {
        let lines = render_status(PollingStatus::AuthRequired, None);
        assert!(lines.iter().any(|l| l.contains("tray login")));
    }

    #[test]
    fn test_render_recent_jobs_and_error() {
        let state = NormalizedState {
            worker_connected: true,
            processing: 1,
            complete: 4,
            recent_jobs: vec![
                RecentJob {
                    id: "0123456789abcdef".to_string(),
                    status: JobStatus::Failed,
                    error: Some("OOM".to_string()),
                },
                RecentJob {
                    id: "fedcba98".to_string(),
                    status: JobStatus::Complete,
                    error: None,
                },
            ],
            ..NormalizedState::default()
        };

        let lines = render_status(PollingStatus::Active, Some(&state));
        assert_eq!(lines[1], "Status: orange");
        assert!(lines.contains(&"  01234567  failed  OOM".to_string()));
        assert!(lines.contains(&"  fedcba98  complete".to_string()));
        assert!(lines.contains(&"Jobs: 4 complete, 0 failed".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Last poll failed")));
    }
}
