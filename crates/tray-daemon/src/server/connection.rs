use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tray_protocol::{ClientMessage, DaemonMessage};

use super::app::AppEvent;
use super::listener::ControlStream;
use crate::errors::DaemonError;
use crate::protocol::codec::{read_message, write_message};

/// Hand an accepted client to its own task.
pub fn spawn_connection(
    stream: ControlStream,
    events: mpsc::UnboundedSender<AppEvent>,
    shutdown: CancellationToken,
) {
    match stream {
        #[cfg(unix)]
        ControlStream::Unix(stream) => {
            tokio::spawn(handle_connection(stream, events, shutdown));
        }
        ControlStream::Loopback(stream) => {
            tokio::spawn(handle_connection(stream, events, shutdown));
        }
    }
}

/// Serve one client connection until EOF, a write failure, or shutdown.
///
/// Requests are answered in order. Anything touching daemon state is
/// forwarded to the event loop; `ping` and `daemon_stop` are answered here
/// so the acknowledgement is flushed before shutdown begins.
pub async fn handle_connection<S>(
    stream: S,
    events: mpsc::UnboundedSender<AppEvent>,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    debug!(event = "daemon.connection.accepted");

    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    loop {
        let read = tokio::select! {
            read = read_message::<_, ClientMessage>(&mut reader) => read,
            _ = shutdown.cancelled() => break,
        };

        let request = match read {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(DaemonError::ProtocolError(message)) => {
                warn!(event = "daemon.connection.invalid_request", error = %message);
                let response = error_response(String::new(), DaemonError::ProtocolError(message));
                if write_message(&mut writer, &response).await.is_err() {
                    break;
                }
                continue;
            }
            Err(e) => {
                debug!(event = "daemon.connection.read_failed", error = %e);
                break;
            }
        };

        let stop_requested = matches!(request, ClientMessage::DaemonStop { .. });
        let response = dispatch(request, &events).await;

        if let Err(e) = write_message(&mut writer, &response).await {
            debug!(event = "daemon.connection.write_failed", error = %e);
            break;
        }

        if stop_requested {
            info!(event = "daemon.server.stop_requested");
            shutdown.cancel();
            break;
        }
    }

    debug!(event = "daemon.connection.closed");
}

async fn dispatch(request: ClientMessage, events: &mpsc::UnboundedSender<AppEvent>) -> DaemonMessage {
    match request {
        ClientMessage::Ping { id } | ClientMessage::DaemonStop { id } => DaemonMessage::Ack { id },
        request => {
            let id = request.id().to_string();
            let (reply_tx, reply_rx) = oneshot::channel();
            let forwarded = events.send(AppEvent::Request {
                message: request,
                reply: reply_tx,
            });
            if forwarded.is_err() {
                return error_response(id, DaemonError::NotRunning);
            }
            match reply_rx.await {
                Ok(response) => response,
                // Event loop exited mid-request.
                Err(_) => error_response(id, DaemonError::NotRunning),
            }
        }
    }
}

fn error_response(id: String, error: DaemonError) -> DaemonMessage {
    DaemonMessage::Error {
        id,
        code: error.wire_code(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_handler_serves_any_byte_stream() {
        let (client, server) = tokio::io::duplex(4096);
        let (events, _events_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let handler = tokio::spawn(handle_connection(server, events, shutdown));

        let (reader, mut writer) = tokio::io::split(client);
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        writer.write_all(b"{oops\n").await.unwrap();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.contains(r#""type":"error""#), "{}", line);

        writer
            .write_all(b"{\"type\":\"ping\",\"id\":\"d-1\"}\n")
            .await
            .unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.contains(r#""type":"ack""#), "{}", line);
        assert!(line.contains("d-1"));

        drop(writer);
        drop(reader);
        handler.await.unwrap();
    }
}
