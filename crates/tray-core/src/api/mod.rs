//! Backend admin API.
//!
//! [`StatusSource`] and [`WorkerControl`] are the seams the poller and the
//! daemon depend on; [`ApiClient`] is the HTTP implementation.

mod client;
pub mod errors;
pub mod types;

pub use client::ApiClient;
pub use errors::ApiError;
pub use types::{RawDashboard, RawGpu, RawJob, RawJobs, RawQueue, RawWorker, RawWorkerInfo};

use async_trait::async_trait;

/// Read-only status endpoints polled every tick.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn dashboard(&self) -> Result<RawDashboard, ApiError>;

    async fn gpu(&self) -> Result<RawGpu, ApiError>;

    /// Most recent jobs first, at most `limit`.
    async fn jobs(&self, limit: usize) -> Result<RawJobs, ApiError>;
}

/// Backend-side worker controls.
#[async_trait]
pub trait WorkerControl: Send + Sync {
    /// Stop the backend from assigning jobs to its GPU worker.
    async fn pause_worker(&self) -> Result<(), ApiError>;

    async fn resume_worker(&self) -> Result<(), ApiError>;
}
