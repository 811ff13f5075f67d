use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("home directory not found — set $HOME environment variable")]
    HomeNotFound,
}

/// Name of the per-user state directory under `$HOME`.
pub const TRAY_DIR_NAME: &str = ".3dify-tray";

/// Centralized path construction for the `~/.3dify-tray/` directory layout.
///
/// Single source of truth for every path the supervisor reads or writes. Use
/// `resolve()` in production code and `from_dir()` in tests.
#[derive(Debug, Clone)]
pub struct TrayPaths {
    tray_dir: PathBuf,
}

impl TrayPaths {
    /// Resolve paths from the user's home directory (`~/.3dify-tray`).
    pub fn resolve() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeNotFound)?;
        Ok(Self {
            tray_dir: home.join(TRAY_DIR_NAME),
        })
    }

    /// Resolve from the home directory, falling back to `/tmp/.3dify-tray`.
    ///
    /// For callers that must always produce a path (defaults in serde
    /// structs, daemon startup).
    pub fn resolve_or_tmp() -> Self {
        Self::resolve()
            .unwrap_or_else(|_| Self::from_dir(PathBuf::from("/tmp").join(TRAY_DIR_NAME)))
    }

    /// Create paths from an explicit base directory. Use in tests.
    pub fn from_dir(tray_dir: PathBuf) -> Self {
        Self { tray_dir }
    }

    /// The base `~/.3dify-tray` directory.
    pub fn tray_dir(&self) -> &Path {
        &self.tray_dir
    }

    // --- Top-level files ---

    pub fn user_config(&self) -> PathBuf {
        self.tray_dir.join("config.toml")
    }

    /// Optional `KEY=VALUE` file consulted for variables the process
    /// environment does not set.
    pub fn env_file(&self) -> PathBuf {
        self.tray_dir.join(".env")
    }

    pub fn daemon_socket(&self) -> PathBuf {
        self.tray_dir.join("daemon.sock")
    }

    pub fn daemon_pid_file(&self) -> PathBuf {
        self.tray_dir.join("daemon.pid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_paths() -> TrayPaths {
        TrayPaths::from_dir(PathBuf::from("/home/user/.3dify-tray"))
    }

    #[test]
    fn test_resolve_returns_ok_when_home_set() {
        // HOME is set in every CI and dev environment we run in
        let paths = TrayPaths::resolve().unwrap();
        assert!(paths.tray_dir().ends_with(TRAY_DIR_NAME));
    }

    #[test]
    fn test_from_dir() {
        let paths = TrayPaths::from_dir(PathBuf::from("/custom/dir"));
        assert_eq!(paths.tray_dir(), Path::new("/custom/dir"));
    }

    #[test]
    fn test_user_config() {
        assert_eq!(
            test_paths().user_config(),
            PathBuf::from("/home/user/.3dify-tray/config.toml")
        );
    }

    #[test]
    fn test_env_file() {
        assert_eq!(
            test_paths().env_file(),
            PathBuf::from("/home/user/.3dify-tray/.env")
        );
    }

    #[test]
    fn test_daemon_socket() {
        assert_eq!(
            test_paths().daemon_socket(),
            PathBuf::from("/home/user/.3dify-tray/daemon.sock")
        );
    }

    #[test]
    fn test_daemon_pid_file() {
        assert_eq!(
            test_paths().daemon_pid_file(),
            PathBuf::from("/home/user/.3dify-tray/daemon.pid")
        );
    }
}
