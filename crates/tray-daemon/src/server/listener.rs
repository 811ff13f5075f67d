use std::path::Path;

use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tracing::info;

use crate::errors::DaemonError;
use crate::types::ControlTransport;

/// Bound control endpoint.
#[derive(Debug)]
pub enum ControlListener {
    #[cfg(unix)]
    Unix(UnixListener),
    Loopback(TcpListener),
}

/// One accepted client.
#[derive(Debug)]
pub enum ControlStream {
    #[cfg(unix)]
    Unix(UnixStream),
    Loopback(TcpStream),
}

impl ControlListener {
    /// Bind `transport` at `endpoint`. For loopback the endpoint file is
    /// written only after the port is bound, so a client that finds the file
    /// can connect.
    pub async fn bind(transport: ControlTransport, endpoint: &Path) -> Result<Self, DaemonError> {
        if let Some(parent) = endpoint.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match transport {
            #[cfg(unix)]
            ControlTransport::Unix => Ok(ControlListener::Unix(UnixListener::bind(endpoint)?)),
            ControlTransport::Loopback => {
                let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
                let addr = listener.local_addr()?;

                let staging = endpoint.with_extension("tmp");
                std::fs::write(&staging, format!("{}\n", addr))?;
                std::fs::rename(&staging, endpoint)?;

                info!(
                    event = "daemon.server.loopback_bound",
                    addr = %addr,
                    endpoint = %endpoint.display(),
                );
                Ok(ControlListener::Loopback(listener))
            }
        }
    }

    pub async fn accept(&self) -> std::io::Result<ControlStream> {
        match self {
            #[cfg(unix)]
            ControlListener::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(ControlStream::Unix(stream))
            }
            ControlListener::Loopback(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(ControlStream::Loopback(stream))
            }
        }
    }
}
