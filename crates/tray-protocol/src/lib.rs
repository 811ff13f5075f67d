pub mod client;
mod messages;
mod types;

pub use client::{IpcConnection, IpcError};
pub use messages::{ClientMessage, DaemonMessage, ErrorCode};
pub use types::{ActionResult, JobStatus, NormalizedState, PollingStatus, RecentJob, WorkerStatus};
