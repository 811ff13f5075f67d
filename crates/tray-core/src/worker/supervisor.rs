use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tray_config::{ExecutionContext, WorkerConfig};
use tray_protocol::WorkerStatus;

use super::command::{LaunchCommand, interrupt_command, launch_command, orphan_sweep_command};
use super::errors::WorkerError;
use super::output::OutputRing;

/// How long the exit watcher waits for the output readers to drain.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

struct ActiveWorker {
    generation: u64,
    pid: Option<u32>,
    /// Dropping or firing this makes the exit watcher kill the child.
    kill_tx: Option<oneshot::Sender<()>>,
}

struct Shared {
    generation: u64,
    active: Option<ActiveWorker>,
    output: OutputRing,
    exit_code: Option<i32>,
}

impl Shared {
    /// Clear the active worker if it still belongs to `generation`.
    fn finish(&mut self, generation: u64) -> bool {
        if self
            .active
            .as_ref()
            .is_some_and(|a| a.generation == generation)
        {
            self.active = None;
            true
        } else {
            false
        }
    }
}

/// Owns at most one worker subprocess.
///
/// Every asynchronous completion (exit watcher, grace timer) carries the
/// generation it was started for and is ignored once a newer worker exists.
pub struct WorkerSupervisor {
    config: WorkerConfig,
    shared: Arc<Mutex<Shared>>,
    running_tx: watch::Sender<bool>,
}

impl WorkerSupervisor {
    pub fn new(config: WorkerConfig) -> Self {
        let (running_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Mutex::new(Shared {
                generation: 0,
                active: None,
                output: OutputRing::new(config.output_lines),
                exit_code: None,
            })),
            config,
            running_tx,
        }
    }

    /// Running flag updates, for merging into snapshots.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.running_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.lock().active.is_some()
    }

    pub fn status(&self) -> WorkerStatus {
        let shared = self.lock();
        WorkerStatus {
            running: shared.active.is_some(),
            pid: shared.active.as_ref().and_then(|a| a.pid),
            exit_code: shared.exit_code,
            output: shared.output.lines(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Spawn the worker. Must be called from within a tokio runtime.
    ///
    /// Rejected, before anything is spawned, when a worker is already
    /// running, when the worker paths are not configured, or when a
    /// configured value contains shell metacharacters.
    pub fn start(&self) -> Result<(), WorkerError> {
        let mut shared = self.lock();
        if shared.active.is_some() {
            return Err(WorkerError::AlreadyRunning);
        }

        let launch = launch_command(&self.config).inspect_err(|e| {
            warn!(event = "core.worker.start_rejected", error = %e);
        })?;

        info!(
            event = "core.worker.start_started",
            program = %launch.program,
            context = %self.config.context
        );

        shared.output.clear();
        shared.exit_code = None;

        let mut child = match Command::new(&launch.program)
            .args(&launch.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                shared.output.push(format!("[worker error: {}]", e));
                error!(event = "core.worker.start_failed", error = %e);
                return Err(WorkerError::SpawnFailed {
                    message: e.to_string(),
                });
            }
        };

        shared.generation += 1;
        let generation = shared.generation;
        let pid = child.id();
        let (kill_tx, kill_rx) = oneshot::channel();
        shared.active = Some(ActiveWorker {
            generation,
            pid,
            kill_tx: Some(kill_tx),
        });

        let readers = [
            child
                .stdout
                .take()
                .map(|out| spawn_line_reader(out, None, generation, self.shared.clone())),
            child.stderr.take().map(|err| {
                spawn_line_reader(err, Some("[stderr] "), generation, self.shared.clone())
            }),
        ];

        tokio::spawn(watch_exit(
            child,
            kill_rx,
            readers,
            generation,
            self.shared.clone(),
            self.running_tx.clone(),
        ));

        drop(shared);
        self.running_tx.send_replace(true);

        info!(
            event = "core.worker.start_completed",
            pid = pid,
            generation = generation
        );
        Ok(())
    }

    /// Ask the worker to exit, escalating to a hard kill after the grace
    /// period. Must be called from within a tokio runtime.
    pub fn stop(&self) -> Result<(), WorkerError> {
        let mut shared = self.lock();
        let Some(active) = shared.active.as_mut() else {
            return Err(WorkerError::NotRunning);
        };
        let generation = active.generation;

        info!(
            event = "core.worker.stop_started",
            pid = active.pid,
            generation = generation
        );

        let interrupted = match interrupt_command(&self.config) {
            Ok(Some(command)) => spawn_in_context(command),
            Ok(None) => send_interrupt(active.pid),
            Err(e) => Err(e),
        };
        if let Err(e) = interrupted {
            // Nothing to be graceful with; kill right away.
            warn!(event = "core.worker.interrupt_failed", error = %e);
            if let Some(kill_tx) = active.kill_tx.take() {
                let _ = kill_tx.send(());
            }
            return Ok(());
        }
        drop(shared);

        let grace = Duration::from_secs(self.config.stop_grace_secs);
        let shared = self.shared.clone();
        // Killing the `wsl` launcher does not reach the Linux side, so the
        // escalation repeats in context there.
        let sweep_config = matches!(self.config.context, ExecutionContext::Wsl)
            .then(|| self.config.clone());
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let expired = {
                let mut shared = shared.lock().unwrap_or_else(|e| e.into_inner());
                match shared.active.as_mut() {
                    Some(active) if active.generation == generation => {
                        active.kill_tx.take().map(|kill_tx| kill_tx.send(()))
                    }
                    _ => None,
                }
            };
            if expired.is_none() {
                return;
            }
            warn!(
                event = "core.worker.stop_grace_expired",
                generation = generation,
                grace_secs = grace.as_secs()
            );
            if let Some(config) = sweep_config {
                let _ = tokio::task::spawn_blocking(move || sweep_orphans(&config)).await;
            }
        });

        Ok(())
    }

    /// Hard-kill the worker with no grace period, then sweep orphans.
    ///
    /// Synchronous and infallible so it can run during shutdown.
    pub fn force_stop(&self) {
        let active = {
            let mut shared = self.lock();
            shared.active.take()
        };

        if let Some(mut active) = active {
            info!(
                event = "core.worker.force_stop_started",
                pid = active.pid,
                generation = active.generation
            );
            send_kill(active.pid);
            if let Some(kill_tx) = active.kill_tx.take() {
                let _ = kill_tx.send(());
            }
        }

        self.running_tx.send_replace(false);
        self.kill_orphans();
    }

    /// Best-effort `pkill` of anything running the worker command inside the
    /// execution context. Blocks until the sweep finishes; failures are
    /// logged and swallowed.
    pub fn kill_orphans(&self) {
        sweep_orphans(&self.config);
    }

    /// [`kill_orphans`](Self::kill_orphans) on the blocking pool. Starting a
    /// WSL distribution for the sweep can take seconds.
    pub fn spawn_orphan_sweep(&self) -> JoinHandle<()> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || sweep_orphans(&config))
    }
}

fn sweep_orphans(config: &WorkerConfig) {
    let sweep = match orphan_sweep_command(config) {
        Ok(sweep) => sweep,
        Err(e) => {
            debug!(event = "core.worker.orphan_sweep_skipped", reason = %e);
            return;
        }
    };
    if which::which(&sweep.program).is_err() {
        debug!(
            event = "core.worker.orphan_sweep_skipped",
            reason = "launcher not found",
            program = %sweep.program
        );
        return;
    }

    match std::process::Command::new(&sweep.program)
        .args(&sweep.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        // pkill exits 1 when nothing matched.
        Ok(status) => debug!(
            event = "core.worker.orphan_sweep_completed",
            matched = status.success()
        ),
        Err(e) => debug!(event = "core.worker.orphan_sweep_failed", error = %e),
    }
}

/// Run an in-context signal command without waiting on it.
fn spawn_in_context(command: LaunchCommand) -> Result<(), WorkerError> {
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| WorkerError::SignalFailed {
            message: format!("{}: {}", command.program, e),
        })?;

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!(
                event = "core.worker.interrupt_delivered",
                matched = status.success()
            ),
            Err(e) => debug!(event = "core.worker.interrupt_wait_failed", error = %e),
        }
    });
    Ok(())
}

fn spawn_line_reader<R>(
    reader: R,
    prefix: Option<&'static str>,
    generation: u64,
    shared: Arc<Mutex<Shared>>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.is_empty() {
                        continue;
                    }
                    let mut shared = shared.lock().unwrap_or_else(|e| e.into_inner());
                    if shared.generation != generation {
                        break;
                    }
                    match prefix {
                        Some(prefix) => shared.output.push(format!("{}{}", prefix, line)),
                        None => shared.output.push(line),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(event = "core.worker.reader_failed", error = %e);
                    break;
                }
            }
        }
    })
}

async fn watch_exit(
    mut child: tokio::process::Child,
    mut kill_rx: oneshot::Receiver<()>,
    readers: [Option<JoinHandle<()>>; 2],
    generation: u64,
    shared: Arc<Mutex<Shared>>,
    running_tx: watch::Sender<bool>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = &mut kill_rx => {
            if let Err(e) = child.start_kill() {
                debug!(event = "core.worker.kill_failed", error = %e);
            }
            child.wait().await
        }
    };

    for reader in readers.into_iter().flatten() {
        let _ = tokio::time::timeout(READER_DRAIN_TIMEOUT, reader).await;
    }

    let code = match &status {
        Ok(status) => exit_code(status),
        Err(e) => {
            error!(event = "core.worker.wait_failed", error = %e);
            -1
        }
    };

    let mut shared = shared.lock().unwrap_or_else(|e| e.into_inner());
    if shared.generation != generation {
        return;
    }
    shared
        .output
        .push(format!("[worker exited with code {}]", code));
    shared.exit_code = Some(code);
    let was_current = shared.finish(generation);
    drop(shared);

    if was_current {
        running_tx.send_replace(false);
    }
    info!(
        event = "core.worker.exited",
        generation = generation,
        code = code
    );
}

/// Exit code, or `128 + signal` when the worker was killed by a signal.
fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(unix)]
fn send_interrupt(pid: Option<u32>) -> Result<(), WorkerError> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = pid.ok_or_else(|| WorkerError::SignalFailed {
        message: "worker pid unknown".to_string(),
    })?;
    kill(Pid::from_raw(pid as i32), Signal::SIGINT).map_err(|e| WorkerError::SignalFailed {
        message: e.to_string(),
    })
}

#[cfg(not(unix))]
fn send_interrupt(_pid: Option<u32>) -> Result<(), WorkerError> {
    Err(WorkerError::SignalFailed {
        message: "no local signal delivery on this platform".to_string(),
    })
}

#[cfg(unix)]
fn send_kill(pid: Option<u32>) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    if let Some(pid) = pid
        && let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL)
    {
        debug!(event = "core.worker.kill_failed", pid = pid, error = %e);
    }
}

#[cfg(not(unix))]
fn send_kill(_pid: Option<u32>) {}
