use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use clap::ArgMatches;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use tray_protocol::{ClientMessage, DaemonMessage, IpcError, NormalizedState, PollingStatus};

use super::helpers::{load_config_with_warning, ping_daemon, request_id, send_request};

const DAEMON_BINARY: &str = "tray-daemon";
const READY_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_STEP: Duration = Duration::from_millis(100);

pub(crate) fn handle_daemon_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("start", sub)) => handle_daemon_start(sub),
        Some(("stop", sub)) => handle_daemon_stop(sub),
        Some(("status", sub)) => handle_daemon_status(sub),
        _ => Err("Unknown daemon subcommand".into()),
    }
}

fn handle_daemon_start(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let foreground = matches.get_flag("foreground");

    info!(event = "cli.daemon.start_started", foreground = foreground);

    if ping_daemon() {
        match read_daemon_pid() {
            Some(pid) => println!("Daemon already running (PID: {})", pid),
            None => println!("Daemon already running"),
        }
        return Ok(());
    }

    let daemon_binary = find_daemon_binary()?;

    if foreground {
        let status = Command::new(&daemon_binary)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| format!("Failed to start daemon: {}", e))?;

        if !status.success() {
            error!(event = "cli.daemon.start_failed", exit_code = ?status.code());
            return Err(format!("Daemon exited with {}", status).into());
        }
        info!(event = "cli.daemon.start_completed");
        return Ok(());
    }

    let mut child = Command::new(&daemon_binary)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("Failed to start daemon: {}", e))?;

    debug!(event = "cli.daemon.spawn_completed", pid = child.id());

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                error!(event = "cli.daemon.start_failed", reason = "child_exited", status = %status);
                return Err(format!(
                    "Daemon exited with {} before becoming ready.\n\
                     Try: tray daemon start --foreground  (to see startup errors)",
                    status
                )
                .into());
            }
            Ok(None) => {}
            Err(e) => debug!(event = "cli.daemon.child_status_check_failed", error = %e),
        }

        if ping_daemon() {
            break;
        }

        if start.elapsed() > READY_TIMEOUT {
            eprintln!("Daemon started but not answering after 5s.");
            eprintln!("Try: tray daemon start --foreground  (to see startup errors)");
            return Err("Daemon endpoint not available after 5s".into());
        }
        std::thread::sleep(POLL_STEP);
    }

    match read_daemon_pid() {
        Some(pid) => {
            println!("Daemon started (PID: {})", pid);
            info!(event = "cli.daemon.start_completed", pid = pid);
        }
        None => {
            warn!(event = "cli.daemon.pid_read_failed");
            println!("Daemon started (PID unknown)");
            info!(event = "cli.daemon.start_completed");
        }
    }

    Ok(())
}

fn handle_daemon_stop(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let timeout = Duration::from_secs(matches.get_one::<u64>("timeout").copied().unwrap_or(5));
    info!(event = "cli.daemon.stop_started", timeout_secs = timeout.as_secs());

    let request = ClientMessage::DaemonStop { id: request_id() };
    match send_request(&request, Some(Duration::from_secs(5))) {
        Ok(_) => {
            let config = tray_daemon::load_daemon_config();
            let start = Instant::now();

            // The daemon force-stops a running worker before it exits, which
            // can take the worker's whole grace period.
            loop {
                if tray_daemon::running_daemon(&config).is_none() {
                    println!("Daemon stopped");
                    info!(event = "cli.daemon.stop_completed");
                    return Ok(());
                }
                if start.elapsed() > timeout {
                    eprintln!("Daemon did not exit within {}s", timeout.as_secs());
                    error!(event = "cli.daemon.stop_failed", reason = "timeout");
                    return Err("Daemon stop timed out".into());
                }
                std::thread::sleep(POLL_STEP);
            }
        }
        Err(IpcError::NotRunning { .. }) => {
            println!("Daemon is not running");
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to stop daemon: {}", e);
            error!(event = "cli.daemon.stop_failed", error = %e);
            Err(e.into())
        }
    }
}

/// Whether the backend answered the daemon's last poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "error")]
enum BackendReach {
    /// No tick has completed since the daemon started.
    Unknown,
    Reachable,
    Unreachable(String),
}

#[derive(Debug, Serialize)]
struct DaemonStatus {
    running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
    endpoint: String,
    server_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    polling: Option<PollingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend: Option<BackendReach>,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_worker_running: Option<bool>,
}

impl DaemonStatus {
    fn stopped(endpoint: String, server_url: String) -> Self {
        Self {
            running: false,
            pid: None,
            endpoint,
            server_url,
            polling: None,
            backend: None,
            local_worker_running: None,
        }
    }

    /// Status of a daemon that answered `get_state`.
    fn answered(
        pid: Option<u32>,
        endpoint: String,
        server_url: String,
        polling: PollingStatus,
        state: Option<&NormalizedState>,
    ) -> Self {
        let backend = match state {
            None => BackendReach::Unknown,
            Some(state) => match &state.error {
                Some(error) => BackendReach::Unreachable(error.clone()),
                None => BackendReach::Reachable,
            },
        };
        Self {
            running: true,
            pid,
            endpoint,
            server_url,
            polling: Some(polling),
            backend: Some(backend),
            local_worker_running: state.map(|s| s.local_worker_running),
        }
    }

    fn lines(&self) -> Vec<String> {
        if !self.running {
            return vec!["Daemon: stopped".to_string()];
        }

        let mut lines = vec![match self.pid {
            Some(pid) => format!("Daemon: running (PID: {})", pid),
            None => "Daemon: running (PID unknown)".to_string(),
        }];
        lines.push(format!("Endpoint: {}", self.endpoint));
        lines.push(format!("Server: {}", self.server_url));

        if let Some(polling) = self.polling {
            lines.push(match polling {
                PollingStatus::Active => "Polling: active".to_string(),
                PollingStatus::AuthRequired => {
                    "Polling: waiting for a token (run 'tray login')".to_string()
                }
                PollingStatus::Stopped => "Polling: stopped".to_string(),
            });
        }
        match &self.backend {
            Some(BackendReach::Unknown) => lines.push("Backend: no poll completed yet".to_string()),
            Some(BackendReach::Reachable) => lines.push("Backend: reachable".to_string()),
            Some(BackendReach::Unreachable(error)) => {
                lines.push(format!("Backend: unreachable ({})", error))
            }
            None => {}
        }
        if let Some(running) = self.local_worker_running {
            lines.push(format!(
                "Local worker: {}",
                if running { "running" } else { "stopped" }
            ));
        }
        lines
    }
}

fn handle_daemon_status(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let json = matches.get_flag("json");
    info!(event = "cli.daemon.status_started");

    let config = tray_daemon::load_daemon_config();
    let endpoint = config.socket_path.display().to_string();
    let server_url = load_config_with_warning().server.url;

    let request = ClientMessage::GetState { id: request_id() };
    let status = match send_request(&request, Some(Duration::from_secs(2))) {
        Ok(DaemonMessage::State { polling, state, .. }) => DaemonStatus::answered(
            tray_daemon::running_daemon(&config),
            endpoint,
            server_url,
            polling,
            state.as_ref(),
        ),
        Ok(other) => {
            warn!(event = "cli.daemon.status_unexpected_response", response = ?other);
            DaemonStatus::stopped(endpoint, server_url)
        }
        Err(IpcError::NotRunning { .. }) => DaemonStatus::stopped(endpoint, server_url),
        Err(e) => {
            debug!(event = "cli.daemon.status_query_failed", error = %e);
            DaemonStatus::stopped(endpoint, server_url)
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        for line in status.lines() {
            println!("{}", line);
        }
    }

    info!(event = "cli.daemon.status_completed", running = status.running);
    Ok(())
}

fn read_daemon_pid() -> Option<u32> {
    tray_daemon::running_daemon(&tray_daemon::load_daemon_config())
}

/// The daemon binary installed next to this one.
fn find_daemon_binary() -> Result<PathBuf, String> {
    let our_binary =
        std::env::current_exe().map_err(|e| format!("could not determine binary path: {}", e))?;
    let bin_dir = our_binary
        .parent()
        .ok_or_else(|| format!("binary has no parent directory: {}", our_binary.display()))?;

    let name = format!("{}{}", DAEMON_BINARY, std::env::consts::EXE_SUFFIX);
    let sibling = bin_dir.join(&name);
    if !sibling.exists() {
        return Err(format!(
            "{} binary not found at {}. Run 'cargo build --all' to build it.",
            name,
            sibling.display()
        ));
    }
    Ok(sibling)
}
