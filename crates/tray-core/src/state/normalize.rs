//! Raw payloads to [`NormalizedState`].

use tray_protocol::{NormalizedState, RecentJob};

use crate::api::{RawDashboard, RawGpu, RawJobs};

/// Build a snapshot from whatever raw payloads are available.
///
/// Any input may be `None` (never fetched yet); the corresponding fields keep
/// their empty values. `local_worker_running` is left false for the caller
/// to fill in.
pub fn normalize(
    dashboard: Option<&RawDashboard>,
    gpu: Option<&RawGpu>,
    jobs: Option<&RawJobs>,
    jobs_limit: usize,
) -> NormalizedState {
    let mut state = NormalizedState::default();

    if let Some(dashboard) = dashboard {
        if let Some(worker) = &dashboard.worker {
            state.worker_connected = worker.connected.unwrap_or(false);
            state.paused = worker.paused.unwrap_or(false);
            state.gpu_name = worker
                .gpu_name
                .clone()
                .filter(|n| !n.is_empty())
                .or_else(|| {
                    worker
                        .info
                        .as_ref()
                        .and_then(|info| info.gpu_name.clone())
                        .filter(|n| !n.is_empty())
                });
        }

        if let Some(queue) = &dashboard.queue {
            state.pending = queue.pending.unwrap_or(0) + queue.assigned.unwrap_or(0);
            state.processing = queue.processing.unwrap_or(0);
            state.complete = queue.complete.or(queue.completed).unwrap_or(0);
            state.failed = queue.failed.unwrap_or(0) + queue.expired.unwrap_or(0);
        }
    }

    if let Some(jobs) = jobs {
        state.recent_jobs = jobs
            .jobs
            .iter()
            .filter(|job| !job.id.is_empty())
            .take(jobs_limit)
            .map(|job| RecentJob {
                id: job.id.clone(),
                status: job.status,
                error: job
                    .error_message
                    .clone()
                    .or_else(|| job.error.clone())
                    .filter(|e| !e.is_empty()),
            })
            .collect();
    }

    if let Some(gpu) = gpu {
        state.gpu_temp = gpu.temperature.or(gpu.temp);
        state.gpu_util = gpu.utilization.or(gpu.util);
        state.gpu_vram_total = gpu.vram_total.or(gpu.memory_total);
        state.gpu_vram_used = gpu.vram_used.or(gpu.memory_used);
        if let (Some(total), Some(used)) = (state.gpu_vram_total, state.gpu_vram_used) {
            state.gpu_vram_free = Some(((total - used) * 10.0).round() / 10.0);
        }
        if state.gpu_name.is_none() {
            state.gpu_name = gpu.name.clone().filter(|n| !n.is_empty());
        }
    }

    state
}
