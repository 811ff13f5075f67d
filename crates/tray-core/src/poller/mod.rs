//! Periodic backend polling.
//!
//! A [`Poller`] runs one tokio task per polling session. The task exclusively
//! owns the [`PollCycle`] (tick counter, raw cache, previous snapshot) and
//! talks to the outside world only through the callbacks given to
//! [`Poller::start`]. [`Poller::stop`] discards those callbacks, so nothing
//! from a stopped session is ever published.

mod cycle;
#[cfg(test)]
pub(crate) mod testing;

pub use cycle::{Endpoint, Fetched, PollCycle, RawSnapshotCache, endpoints_for_tick};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tray_protocol::NormalizedState;

use crate::api::StatusSource;
use crate::notify::NotificationEngine;

type StateCallback = Box<dyn Fn(NormalizedState) + Send>;
type AuthCallback = Box<dyn FnOnce() + Send>;

struct Callbacks {
    on_state: StateCallback,
    on_auth_required: Option<AuthCallback>,
}

/// Liveness of one polling session, shared by the task and the [`Poller`].
struct Session {
    generation: u64,
    active: AtomicBool,
    callbacks: Mutex<Option<Callbacks>>,
}

impl Session {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Drop the callbacks. After this returns no callback can fire.
    fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    /// Hand `state` to `on_state` if the session is still live.
    fn publish(&self, state: NormalizedState) -> bool {
        let guard = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(callbacks) if self.is_active() => {
                (callbacks.on_state)(state);
                true
            }
            _ => false,
        }
    }

    /// Terminal for the session: fire `on_auth_required` once.
    fn auth_expired(&self) {
        self.active.store(false, Ordering::SeqCst);
        let callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(on_auth) = callbacks.and_then(|c| c.on_auth_required) {
            on_auth();
        }
    }
}

struct RunningSession {
    session: Arc<Session>,
    handle: JoinHandle<()>,
}

/// Drives a [`PollCycle`] on a fixed interval.
pub struct Poller {
    source: Arc<dyn StatusSource>,
    notifications: NotificationEngine,
    interval: Duration,
    jobs_limit: usize,
    worker_running: watch::Receiver<bool>,
    running: Option<RunningSession>,
    next_generation: u64,
}

impl Poller {
    pub fn new(
        source: Arc<dyn StatusSource>,
        notifications: NotificationEngine,
        interval: Duration,
        jobs_limit: usize,
        worker_running: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            notifications,
            interval,
            jobs_limit,
            worker_running,
            running: None,
            next_generation: 0,
        }
    }

    /// Start a new polling session; the first tick runs immediately.
    ///
    /// Any previous session is stopped first. Must be called from within a
    /// tokio runtime. Returns the session generation.
    pub fn start<S, A>(&mut self, on_state: S, on_auth_required: A) -> u64
    where
        S: Fn(NormalizedState) + Send + 'static,
        A: FnOnce() + Send + 'static,
    {
        self.stop();

        let generation = self.next_generation;
        self.next_generation += 1;

        let session = Arc::new(Session {
            generation,
            active: AtomicBool::new(true),
            callbacks: Mutex::new(Some(Callbacks {
                on_state: Box::new(on_state),
                on_auth_required: Some(Box::new(on_auth_required)),
            })),
        });

        let task = PollTask {
            session: session.clone(),
            source: self.source.clone(),
            notifications: self.notifications.clone(),
            interval: self.interval,
            worker_running: self.worker_running.clone(),
            cycle: PollCycle::new(self.jobs_limit),
        };
        let handle = tokio::spawn(task.run());

        info!(
            event = "core.poller.start_completed",
            generation = generation,
            interval_ms = self.interval.as_millis() as u64
        );
        self.running = Some(RunningSession { session, handle });
        generation
    }

    /// Stop polling and discard callbacks. Idempotent.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.session.deactivate();
        running.handle.abort();
        info!(
            event = "core.poller.stop_completed",
            generation = running.session.generation
        );
    }

    /// True while a session is producing snapshots. False after `stop()` and
    /// after a session ended on expired credentials.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| r.session.is_active())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

struct PollTask {
    session: Arc<Session>,
    source: Arc<dyn StatusSource>,
    notifications: NotificationEngine,
    interval: Duration,
    worker_running: watch::Receiver<bool>,
    cycle: PollCycle,
}

impl PollTask {
    async fn run(mut self) {
        let generation = self.session.generation;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.session.is_active() {
                break;
            }

            let tick = self.cycle.tick();
            debug!(
                event = "core.poller.tick_started",
                generation = generation,
                tick = tick
            );

            let result = self.cycle.fetch(self.source.as_ref()).await;

            if !self.session.is_active() {
                debug!(
                    event = "core.poller.tick_discarded",
                    generation = generation,
                    tick = tick
                );
                break;
            }

            let local_worker_running = *self.worker_running.borrow();

            let published = match result {
                Ok(fetched) => {
                    let (state, changes) = self.cycle.apply(fetched, local_worker_running);
                    if !changes.is_empty() {
                        let engine = self.notifications.clone();
                        let _ = tokio::task::spawn_blocking(move || engine.notify_all(&changes))
                            .await;
                    }
                    debug!(
                        event = "core.poller.tick_completed",
                        generation = generation,
                        tick = tick,
                        worker_connected = state.worker_connected
                    );
                    self.session.publish(state)
                }
                Err(e) if e.is_auth_expired() => {
                    warn!(
                        event = "core.poller.auth_expired",
                        generation = generation,
                        tick = tick
                    );
                    self.session.auth_expired();
                    break;
                }
                Err(e) => {
                    warn!(
                        event = "core.poller.tick_failed",
                        generation = generation,
                        tick = tick,
                        error = %e
                    );
                    self.session
                        .publish(self.cycle.degraded(&e, local_worker_running))
                }
            };

            if !published {
                break;
            }
        }

        debug!(event = "core.poller.task_exited", generation = generation);
    }
}
