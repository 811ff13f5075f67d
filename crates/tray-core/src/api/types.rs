//! Raw response payloads, kept as loose as the backend is.
//!
//! Every field is optional or defaulted, so one odd entry never fails a
//! whole payload. Several values exist under two names depending on the
//! backend version; the normalizer decides precedence.

use serde::{Deserialize, Serialize};
use tray_protocol::JobStatus;

/// `GET /api/admin/dashboard`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawDashboard {
    pub worker: Option<RawWorker>,
    pub queue: Option<RawQueue>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawWorker {
    pub connected: Option<bool>,
    pub paused: Option<bool>,
    pub gpu_name: Option<String>,
    pub info: Option<RawWorkerInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawWorkerInfo {
    pub gpu_name: Option<String>,
}

/// Per-status job counts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawQueue {
    pub pending: Option<u64>,
    pub assigned: Option<u64>,
    pub processing: Option<u64>,
    pub complete: Option<u64>,
    pub completed: Option<u64>,
    pub failed: Option<u64>,
    pub expired: Option<u64>,
}

/// `GET /api/admin/gpu`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawGpu {
    pub name: Option<String>,
    pub temperature: Option<f64>,
    pub temp: Option<f64>,
    pub utilization: Option<f64>,
    pub util: Option<f64>,
    pub vram_total: Option<f64>,
    pub memory_total: Option<f64>,
    pub vram_used: Option<f64>,
    pub memory_used: Option<f64>,
}

/// `GET /api/admin/jobs?limit=N`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawJobs {
    pub jobs: Vec<RawJob>,
}

/// `POST /api/admin/login` body.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST /api/admin/login` response.
#[derive(Deserialize)]
pub(crate) struct RawLogin {
    #[serde(default)]
    pub token: String,
}

/// A job entry. Missing `id` reads as empty (dropped by the normalizer),
/// missing or unrecognised `status` as [`JobStatus::Unknown`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawJob {
    pub id: String,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub error: Option<String>,
}
