//! Scripted [`StatusSource`] for poller tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::cycle::Endpoint;
use crate::api::{ApiError, RawDashboard, RawGpu, RawJobs, RawQueue, RawWorker, StatusSource};

#[derive(Default)]
pub struct FakeSource {
    calls: Mutex<Vec<Endpoint>>,
    failures: Mutex<VecDeque<ApiError>>,
    complete: AtomicU64,
    delay_ms: AtomicU64,
}

impl FakeSource {
    pub fn calls(&self) -> Vec<Endpoint> {
        self.calls.lock().unwrap().clone()
    }

    /// The next call (to any endpoint) fails with `error`.
    pub fn fail_next(&self, error: ApiError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn set_complete(&self, n: u64) {
        self.complete.store(n, Ordering::SeqCst);
    }

    /// Every call sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn record(&self, endpoint: Endpoint) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(endpoint);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StatusSource for FakeSource {
    async fn dashboard(&self) -> Result<RawDashboard, ApiError> {
        self.record(Endpoint::Dashboard).await?;
        Ok(RawDashboard {
            worker: Some(RawWorker {
                connected: Some(true),
                ..RawWorker::default()
            }),
            queue: Some(RawQueue {
                complete: Some(self.complete.load(Ordering::SeqCst)),
                ..RawQueue::default()
            }),
        })
    }

    async fn gpu(&self) -> Result<RawGpu, ApiError> {
        self.record(Endpoint::Gpu).await?;
        Ok(RawGpu {
            temperature: Some(60.0),
            ..RawGpu::default()
        })
    }

    async fn jobs(&self, _limit: usize) -> Result<RawJobs, ApiError> {
        self.record(Endpoint::Jobs).await?;
        Ok(RawJobs::default())
    }
}
