use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info, warn};
use tray_config::TrayConfig;
use tray_paths::TrayPaths;
use tray_protocol::{ClientMessage, DaemonMessage, IpcConnection, IpcError};

/// Fresh correlation id for one request.
pub fn request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn socket_path() -> PathBuf {
    tray_daemon::load_daemon_config().socket_path
}

/// Open a connection, send one request, read one response.
pub fn send_request(
    request: &ClientMessage,
    read_timeout: Option<Duration>,
) -> Result<DaemonMessage, IpcError> {
    let mut conn = IpcConnection::connect(&socket_path())?;
    if read_timeout.is_some() {
        conn.set_read_timeout(read_timeout)?;
    }
    conn.send(request)
}

/// True when a daemon answers a ping within a short timeout.
pub fn ping_daemon() -> bool {
    let request = ClientMessage::Ping { id: request_id() };
    matches!(
        send_request(&request, Some(Duration::from_secs(2))),
        Ok(DaemonMessage::Ack { .. })
    )
}

/// Print an IPC failure in user terms.
pub fn report_ipc_error(action: &str, e: &IpcError) {
    match e {
        IpcError::NotRunning { .. } => {
            eprintln!("Daemon is not running. Start it with: tray daemon start");
        }
        other => eprintln!("Failed to {}: {}", action, other),
    }
}

pub fn unexpected_response(response: &DaemonMessage) -> Box<dyn std::error::Error> {
    format!("Unexpected response from daemon: {:?}", response).into()
}

/// Send an action request and report its `ActionResult`.
///
/// `name` completes "Failed to ..." in error output and tags the log events.
pub fn run_action(
    name: &str,
    request: ClientMessage,
    success_message: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    run_action_with_timeout(name, request, success_message, None)
}

/// [`run_action`] with a read timeout other than the connection default.
pub fn run_action_with_timeout(
    name: &str,
    request: ClientMessage,
    success_message: &str,
    read_timeout: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(event = "cli.action_started", action = name);

    let response = match send_request(&request, read_timeout) {
        Ok(response) => response,
        Err(e) => {
            report_ipc_error(name, &e);
            error!(event = "cli.action_failed", action = name, error = %e);
            return Err(e.into());
        }
    };

    match response {
        DaemonMessage::ActionResult { ok: true, .. } => {
            println!("{}", success_message);
            info!(event = "cli.action_completed", action = name);
            Ok(())
        }
        DaemonMessage::ActionResult { ok: false, error, .. } => {
            let message = error.unwrap_or_else(|| "unknown error".to_string());
            eprintln!("Failed to {}: {}", name, message);
            error!(event = "cli.action_failed", action = name, error = %message);
            Err(message.into())
        }
        other => Err(unexpected_response(&other)),
    }
}

/// Load configuration, falling back to defaults with a warning.
pub fn load_config_with_warning() -> TrayConfig {
    let paths = TrayPaths::resolve_or_tmp();
    match TrayConfig::load(&paths) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Could not load config: {}. Using defaults.\n\
                 Tip: Check {} for syntax errors.",
                e,
                paths.user_config().display()
            );
            warn!(
                event = "cli.config.load_failed",
                error = %e,
                "Config load failed, using defaults"
            );
            TrayConfig::default()
        }
    }
}
