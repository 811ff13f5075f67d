pub mod errors;
pub mod pid;
pub mod protocol;
pub mod server;
pub mod types;

// Primary re-exports
pub use errors::DaemonError;
pub use server::run_server;
pub use pid::{InstanceLock, running_daemon};
pub use types::{ControlTransport, DaemonConfig, load_daemon_config};
