pub mod app;
pub mod connection;
pub mod listener;
pub mod shutdown;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tray_config::TrayConfig;

use crate::errors::DaemonError;
use crate::pid::InstanceLock;
use crate::types::DaemonConfig;
use app::App;
use listener::ControlListener;

/// Run the daemon until a signal or a `daemon_stop` request.
///
/// 1. Claims the instance lock (refuses if another daemon is live)
/// 2. Builds the backend client, poller, and worker supervisor
/// 3. Binds the control endpoint
/// 4. Sweeps orphaned workers in the background and starts polling
/// 5. Runs the event loop: accepts, poller completions, client requests
/// 6. On shutdown, stops polling and force-stops the worker; dropping the
///    lock removes the PID file and endpoint
pub async fn run_server(config: DaemonConfig, tray: TrayConfig) -> Result<(), DaemonError> {
    let socket_path = config.socket_path.clone();

    let lock = InstanceLock::acquire(&config)?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut app = App::new(&tray, events_tx.clone())?;

    let listener = match ControlListener::bind(config.transport, &socket_path).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(
                event = "daemon.server.bind_failed",
                socket = %socket_path.display(),
                error = %e,
            );
            return Err(e);
        }
    };

    info!(
        event = "daemon.server.started",
        pid = lock.pid(),
        socket = %socket_path.display(),
        transport = ?config.transport,
        server_url = %tray.server.url,
    );

    app.start();

    let shutdown = CancellationToken::new();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown::wait_for_shutdown_signal(signal_shutdown).await {
            error!(
                event = "daemon.server.signal_handler_failed",
                error = %e,
                "signals will not trigger graceful shutdown; use 'tray daemon stop'",
            );
        }
    });

    loop {
        tokio::select! {
            accept = listener.accept() => {
                match accept {
                    Ok(stream) => {
                        connection::spawn_connection(stream, events_tx.clone(), shutdown.clone());
                    }
                    Err(e) => {
                        error!(event = "daemon.server.accept_failed", error = %e);
                    }
                }
            }
            Some(event) = events_rx.recv() => app.handle_event(event),
            _ = shutdown.cancelled() => {
                info!(event = "daemon.server.shutdown_started");
                break;
            }
        }
    }

    app.shutdown();
    drop(listener);
    drop(lock);

    info!(event = "daemon.server.shutdown_completed");

    Ok(())
}
