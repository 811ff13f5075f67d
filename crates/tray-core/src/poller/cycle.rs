//! One poll tick: which endpoints to hit, the raw cache, and the diff.

use tray_protocol::NormalizedState;

use crate::api::{ApiError, RawDashboard, RawGpu, RawJobs, StatusSource};
use crate::notify::{Notification, detect_changes};
use crate::state::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Dashboard,
    Gpu,
    Jobs,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Dashboard => write!(f, "dashboard"),
            Endpoint::Gpu => write!(f, "gpu"),
            Endpoint::Jobs => write!(f, "jobs"),
        }
    }
}

/// Tick 0 fetches everything; later ticks rotate through one endpoint each.
pub fn endpoints_for_tick(tick: u64) -> &'static [Endpoint] {
    if tick == 0 {
        return &[Endpoint::Dashboard, Endpoint::Gpu, Endpoint::Jobs];
    }
    match tick % 3 {
        0 => &[Endpoint::Dashboard],
        1 => &[Endpoint::Gpu],
        _ => &[Endpoint::Jobs],
    }
}

/// Last successfully fetched payload per endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSnapshotCache {
    pub dashboard: Option<RawDashboard>,
    pub gpu: Option<RawGpu>,
    pub jobs: Option<RawJobs>,
}

impl RawSnapshotCache {
    /// Overwrite only the slots that were fetched.
    fn merge(&mut self, fetched: Fetched) {
        if let Some(dashboard) = fetched.dashboard {
            self.dashboard = Some(dashboard);
        }
        if let Some(gpu) = fetched.gpu {
            self.gpu = Some(gpu);
        }
        if let Some(jobs) = fetched.jobs {
            self.jobs = Some(jobs);
        }
    }
}

/// Payloads fetched during one tick.
#[derive(Debug, Default)]
pub struct Fetched {
    pub dashboard: Option<RawDashboard>,
    pub gpu: Option<RawGpu>,
    pub jobs: Option<RawJobs>,
}

/// Poll state owned by a single polling session.
///
/// Split into [`fetch`](Self::fetch) (read-only, async) and
/// [`apply`](Self::apply) (mutating, sync) so the caller can drop a stale
/// fetch result without touching state.
#[derive(Debug)]
pub struct PollCycle {
    tick: u64,
    cache: RawSnapshotCache,
    previous: Option<NormalizedState>,
    jobs_limit: usize,
}

impl PollCycle {
    pub fn new(jobs_limit: usize) -> Self {
        Self {
            tick: 0,
            cache: RawSnapshotCache::default(),
            previous: None,
            jobs_limit,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn cache(&self) -> &RawSnapshotCache {
        &self.cache
    }

    /// Fetch this tick's endpoints. Any failure fails the whole tick.
    pub async fn fetch(&self, source: &dyn StatusSource) -> Result<Fetched, ApiError> {
        let mut fetched = Fetched::default();
        for endpoint in endpoints_for_tick(self.tick) {
            match endpoint {
                Endpoint::Dashboard => fetched.dashboard = Some(source.dashboard().await?),
                Endpoint::Gpu => fetched.gpu = Some(source.gpu().await?),
                Endpoint::Jobs => fetched.jobs = Some(source.jobs(self.jobs_limit).await?),
            }
        }
        Ok(fetched)
    }

    /// Fold a successful fetch into the cache, build the snapshot, and diff
    /// it against the previous one. Advances the tick.
    pub fn apply(
        &mut self,
        fetched: Fetched,
        local_worker_running: bool,
    ) -> (NormalizedState, Vec<Notification>) {
        self.cache.merge(fetched);

        let mut state = normalize(
            self.cache.dashboard.as_ref(),
            self.cache.gpu.as_ref(),
            self.cache.jobs.as_ref(),
            self.jobs_limit,
        );
        state.local_worker_running = local_worker_running;

        let changes = detect_changes(self.previous.as_ref(), &state);
        self.previous = Some(state.clone());
        self.tick += 1;

        (state, changes)
    }

    /// Snapshot for a failed tick. Leaves tick, cache, and previous as-is.
    pub fn degraded(&self, error: &ApiError, local_worker_running: bool) -> NormalizedState {
        let mut state = NormalizedState::failed_tick(error.to_string());
        state.local_worker_running = local_worker_running;
        state
    }
}
