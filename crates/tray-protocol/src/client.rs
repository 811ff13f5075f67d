//! Synchronous JSONL IPC client for the tray daemon's control endpoint.
//!
//! The endpoint path is either a Unix socket or, on the loopback transport,
//! a small file holding the daemon's `127.0.0.1:port`. Used by the `tray` CLI
//! and by the daemon's integration tests. One request, one response line.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use crate::{ClientMessage, DaemonMessage, ErrorCode};

/// Error from the IPC client layer.
#[derive(Debug)]
pub enum IpcError {
    /// Daemon endpoint does not exist or connection was refused.
    NotRunning { path: String },
    /// Endpoint exists but connection failed for a non-`ConnectionRefused` reason.
    ConnectionFailed(std::io::Error),
    /// Daemon returned an explicit error response.
    DaemonError { code: ErrorCode, message: String },
    /// Protocol-level error (serialization, empty response, invalid JSON).
    ProtocolError { message: String },
    /// Other I/O error.
    Io(std::io::Error),
}

impl std::fmt::Display for IpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpcError::NotRunning { path } => {
                write!(f, "Daemon is not running (no endpoint at {})", path)
            }
            IpcError::ConnectionFailed(e) => write!(f, "Connection failed: {}", e),
            IpcError::DaemonError { code, message } => {
                write!(f, "Daemon error [{}]: {}", code, message)
            }
            IpcError::ProtocolError { message } => write!(f, "Protocol error: {}", message),
            IpcError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for IpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IpcError::ConnectionFailed(e) | IpcError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IpcError {
    fn from(e: std::io::Error) -> Self {
        IpcError::Io(e)
    }
}

/// Internal stream type: Unix socket or loopback TCP.
#[derive(Debug)]
enum IpcStream {
    #[cfg(unix)]
    Unix(UnixStream),
    Loopback(TcpStream),
}

const READ_TIMEOUT: Duration = Duration::from_secs(30);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const LOOPBACK_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// A synchronous JSONL connection to the tray daemon.
#[derive(Debug)]
pub struct IpcConnection {
    stream: IpcStream,
}

fn not_running(path: &Path) -> IpcError {
    IpcError::NotRunning {
        path: path.display().to_string(),
    }
}

fn connect_error(path: &Path, e: std::io::Error) -> IpcError {
    if e.kind() == std::io::ErrorKind::ConnectionRefused {
        not_running(path)
    } else {
        IpcError::ConnectionFailed(e)
    }
}

/// Loopback address recorded in an endpoint file. Anything that is not a
/// `127.0.0.1`/`::1` address is refused so a tampered file cannot redirect
/// the CLI off the machine.
fn read_loopback_addr(endpoint: &Path) -> Result<SocketAddr, IpcError> {
    let content = std::fs::read_to_string(endpoint).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            not_running(endpoint)
        } else {
            IpcError::Io(e)
        }
    })?;
    let addr: SocketAddr = content.trim().parse().map_err(|_| IpcError::ProtocolError {
        message: format!("endpoint file {} holds no address", endpoint.display()),
    })?;
    if !addr.ip().is_loopback() {
        return Err(IpcError::ProtocolError {
            message: format!("endpoint {} is not a loopback address", addr),
        });
    }
    Ok(addr)
}

/// Write one line and read one line back.
fn round_trip<S>(stream: &mut S, msg: &str) -> Result<String, IpcError>
where
    S: Read + Write,
{
    writeln!(stream, "{}", msg)?;
    stream.flush()?;

    // Transient BufReader: exactly one response line per request, so
    // nothing past it may be buffered and lost.
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line)
}

impl IpcConnection {
    /// Connect to the daemon at the given endpoint path.
    ///
    /// A Unix socket is connected directly; any other file is read as a
    /// loopback address. Configures timeouts (30s read, 5s write). Returns
    /// `IpcError::NotRunning` if the endpoint doesn't exist or connection is
    /// refused.
    pub fn connect(socket_path: &Path) -> Result<Self, IpcError> {
        let metadata = match std::fs::metadata(socket_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(not_running(socket_path));
            }
            Err(e) => return Err(IpcError::Io(e)),
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;

            if metadata.file_type().is_socket() {
                let stream = UnixStream::connect(socket_path)
                    .map_err(|e| connect_error(socket_path, e))?;
                stream.set_read_timeout(Some(READ_TIMEOUT))?;
                stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                return Ok(Self {
                    stream: IpcStream::Unix(stream),
                });
            }
        }
        #[cfg(not(unix))]
        let _ = metadata;

        let addr = read_loopback_addr(socket_path)?;
        let stream = TcpStream::connect_timeout(&addr, LOOPBACK_CONNECT_TIMEOUT)
            .map_err(|e| connect_error(socket_path, e))?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        Ok(Self {
            stream: IpcStream::Loopback(stream),
        })
    }

    /// Send a typed request and read one typed response.
    ///
    /// Converts `DaemonMessage::Error` into `IpcError::DaemonError`.
    pub fn send(&mut self, request: &ClientMessage) -> Result<DaemonMessage, IpcError> {
        let msg = serde_json::to_string(request).map_err(|e| IpcError::ProtocolError {
            message: e.to_string(),
        })?;

        let line = match &mut self.stream {
            #[cfg(unix)]
            IpcStream::Unix(s) => round_trip(s, &msg)?,
            IpcStream::Loopback(s) => round_trip(s, &msg)?,
        };

        if line.is_empty() {
            return Err(IpcError::ProtocolError {
                message: "Empty response from daemon".to_string(),
            });
        }

        let response: DaemonMessage =
            serde_json::from_str(&line).map_err(|e| IpcError::ProtocolError {
                message: format!("Invalid JSON response: {}", e),
            })?;

        if let DaemonMessage::Error { code, message, .. } = response {
            return Err(IpcError::DaemonError { code, message });
        }

        Ok(response)
    }

    /// Override the read timeout on the underlying stream.
    ///
    /// `tray daemon status` pings with a short timeout; pause/resume wait on
    /// the backend and need longer than the default.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), IpcError> {
        match &self.stream {
            #[cfg(unix)]
            IpcStream::Unix(s) => Ok(s.set_read_timeout(timeout)?),
            IpcStream::Loopback(s) => Ok(s.set_read_timeout(timeout)?),
        }
    }
}
