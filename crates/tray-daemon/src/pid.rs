//! Single-instance guard.
//!
//! A daemon owns two files: the PID file and its control endpoint. They are
//! claimed together by [`InstanceLock::acquire`] and released together when
//! the lock drops, so an early return anywhere in startup leaves nothing
//! behind.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::DaemonError;
use crate::types::DaemonConfig;

/// What a PID file says about its owner.
#[derive(Debug, PartialEq, Eq)]
enum Owner {
    None,
    Live(u32),
    /// Dead process, or content that is not a PID.
    Stale,
}

fn owner(pid_path: &Path, endpoint_path: &Path) -> Owner {
    match fs::read_to_string(pid_path) {
        Ok(content) => match content.trim().parse::<u32>() {
            Ok(pid) if owner_alive(pid, endpoint_path) => Owner::Live(pid),
            _ => Owner::Stale,
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Owner::None,
        Err(e) => {
            warn!(
                event = "daemon.lock.pid_read_failed",
                path = %pid_path.display(),
                error = %e,
            );
            Owner::Stale
        }
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Ownership of the daemon's PID file and control endpoint.
#[derive(Debug)]
pub struct InstanceLock {
    pid: u32,
    pid_path: PathBuf,
    endpoint_path: PathBuf,
}

impl InstanceLock {
    /// Claim the daemon slot described by `config`.
    ///
    /// - A live owner refuses with [`DaemonError::AlreadyRunning`].
    /// - A stale PID file is removed together with its endpoint.
    /// - An endpoint with no PID file is a leftover and is removed.
    ///
    /// The PID file is created exclusively, so of two daemons racing through
    /// this only one gets the lock.
    pub fn acquire(config: &DaemonConfig) -> Result<Self, DaemonError> {
        let pid_path = &config.pid_path;
        let endpoint_path = &config.socket_path;

        match owner(pid_path, endpoint_path) {
            Owner::Live(pid) => return Err(DaemonError::AlreadyRunning(pid)),
            Owner::Stale => {
                warn!(event = "daemon.lock.stale_detected", path = %pid_path.display());
                remove_if_present(pid_path)?;
                remove_if_present(endpoint_path)?;
            }
            Owner::None => {
                if remove_if_present(endpoint_path)? {
                    info!(
                        event = "daemon.lock.leftover_endpoint_removed",
                        path = %endpoint_path.display(),
                    );
                }
            }
        }

        if let Some(parent) = pid_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pid = std::process::id();
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(pid_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(match owner(pid_path, endpoint_path) {
                    Owner::Live(other) => DaemonError::AlreadyRunning(other),
                    _ => DaemonError::Io(e),
                });
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", pid)?;

        debug!(event = "daemon.lock.acquired", pid = pid, path = %pid_path.display());
        Ok(Self {
            pid,
            pid_path: pid_path.clone(),
            endpoint_path: endpoint_path.clone(),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = remove_if_present(&self.endpoint_path) {
            warn!(
                event = "daemon.lock.endpoint_cleanup_failed",
                path = %self.endpoint_path.display(),
                error = %e,
            );
        }

        // Never delete a PID file another daemon has since claimed.
        let ours = fs::read_to_string(&self.pid_path)
            .ok()
            .and_then(|content| content.trim().parse::<u32>().ok())
            == Some(self.pid);
        if ours && let Err(e) = remove_if_present(&self.pid_path) {
            warn!(
                event = "daemon.lock.pid_cleanup_failed",
                path = %self.pid_path.display(),
                error = %e,
            );
        }
        debug!(event = "daemon.lock.released", pid = self.pid);
    }
}

/// PID of the live daemon described by `config`, if any. Read-only: stale
/// files are left for the next [`InstanceLock::acquire`].
pub fn running_daemon(config: &DaemonConfig) -> Option<u32> {
    match owner(&config.pid_path, &config.socket_path) {
        Owner::Live(pid) => Some(pid),
        _ => None,
    }
}

/// Check whether a process with the given PID is alive.
///
/// Uses `kill(pid, 0)`, which checks existence without sending a signal.
#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match signal::kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        // EPERM: exists, owned by someone else
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(unix)]
fn owner_alive(pid: u32, _endpoint_path: &Path) -> bool {
    is_process_alive(pid)
}

/// Without a portable liveness check a daemon counts as alive while its loopback
/// endpoint accepts connections.
#[cfg(not(unix))]
fn owner_alive(_pid: u32, endpoint_path: &Path) -> bool {
    loopback_endpoint_answers(endpoint_path)
}

#[cfg(any(not(unix), test))]
fn loopback_endpoint_answers(endpoint_path: &Path) -> bool {
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    fs::read_to_string(endpoint_path)
        .ok()
        .and_then(|content| content.trim().parse::<SocketAddr>().ok())
        .is_some_and(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_ok())
}
