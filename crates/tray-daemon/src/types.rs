use std::path::PathBuf;

use tray_paths::TrayPaths;

/// How the control protocol is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTransport {
    /// Unix domain socket at the endpoint path.
    #[cfg(unix)]
    Unix,
    /// TCP listener on `127.0.0.1`, ephemeral port. The endpoint path is a
    /// plain file holding the bound `host:port`.
    Loopback,
}

impl Default for ControlTransport {
    #[cfg(unix)]
    fn default() -> Self {
        ControlTransport::Unix
    }

    #[cfg(not(unix))]
    fn default() -> Self {
        ControlTransport::Loopback
    }
}

/// Filesystem locations owned by a running daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Control endpoint: the Unix socket itself, or the file naming the
    /// loopback address.
    /// Default: `~/.3dify-tray/daemon.sock`
    pub socket_path: PathBuf,

    /// Single-instance PID file.
    /// Default: `~/.3dify-tray/daemon.pid`
    pub pid_path: PathBuf,

    pub transport: ControlTransport,
}

impl DaemonConfig {
    pub fn from_paths(paths: &TrayPaths) -> Self {
        Self {
            socket_path: paths.daemon_socket(),
            pid_path: paths.daemon_pid_file(),
            transport: ControlTransport::default(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_paths(&TrayPaths::resolve_or_tmp())
    }
}

/// Daemon locations under the user's tray directory, falling back to
/// `/tmp/.3dify-tray` when no home directory is available.
pub fn load_daemon_config() -> DaemonConfig {
    DaemonConfig::default()
}
