//! tray-core: monitoring and supervision logic for the 3Dify tray.
//!
//! # Main Entry Points
//!
//! - [`poller`] - Periodic backend polling into [`NormalizedState`] snapshots
//! - [`notify`] - Change detection, dedup, and desktop notifications
//! - [`worker`] - Start/stop/kill of the local GPU worker process
//! - [`api`] - Backend admin API client
//! - [`state`] - Snapshot normalization and presentation helpers

pub mod api;
pub mod errors;
pub mod escape;
pub mod logging;
pub mod notify;
pub mod poller;
pub mod state;
pub mod worker;

pub use tray_protocol::{ActionResult, JobStatus, NormalizedState, RecentJob, WorkerStatus};

pub use api::{ApiClient, ApiError, StatusSource, WorkerControl};
pub use errors::{TrayError, TrayResult};
pub use notify::{DesktopNotifier, Notification, NotificationEngine, Notifier, NotifyError};
pub use poller::Poller;
pub use state::{TrayStatus, normalize};
pub use worker::{WorkerError, WorkerSupervisor};

// Re-export logging initialization
pub use logging::init_logging;
