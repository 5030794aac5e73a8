// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Background scheduler driving the poll loop.
//!
//! A [`Worker`] owns at most one tokio task. The task runs the iteration,
//! sleeps for the configured interval and starts over until the worker is
//! stopped. Stopping cancels a [`CancellationToken`] the loop selects on, so
//! an iteration blocked on agent I/O is dropped at its current await point.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

type Iteration = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Lifecycle of the poll task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No task is running.
    Idle,
    /// The task was spawned but has not run its first iteration yet.
    Starting,
    Started,
    /// Cancellation was requested and the task has not exited yet.
    Stopping,
}

struct Running {
    state: WorkerState,
    task: Option<JoinHandle<()>>,
    cancel: Option<CancellationToken>,
}

/// Runs an iteration every `interval` on a tokio task until stopped.
///
/// `start` and `stop` are idempotent and may be called from any thread.
pub struct Worker {
    interval: Duration,
    runtime: Handle,
    iteration: Iteration,
    running: Arc<Mutex<Running>>,
}

impl Worker {
    /// Creates an idle worker spawning its loop on `runtime` once started.
    pub fn new<F, Fut>(interval: Duration, runtime: Handle, iteration: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            interval,
            runtime,
            iteration: Arc::new(move || iteration().boxed()),
            running: Arc::new(Mutex::new(Running {
                state: WorkerState::Idle,
                task: None,
                cancel: None,
            })),
        }
    }

    /// Spawns the poll loop unless it is already running.
    ///
    /// Starting while a previous loop is still stopping spawns a new loop
    /// right away.
    pub fn start(&self) {
        let mut running = lock(&self.running);
        if matches!(running.state, WorkerState::Starting | WorkerState::Started) {
            return;
        }

        let cancel = CancellationToken::new();
        let task = self.runtime.spawn(poll_loop(
            Arc::clone(&self.running),
            cancel.clone(),
            self.interval,
            Arc::clone(&self.iteration),
        ));
        running.state = WorkerState::Starting;
        running.task = Some(task);
        running.cancel = Some(cancel);
        debug!(interval = ?self.interval, "remote-config: worker started");
    }

    /// Cancels the poll loop. No-op when the worker is idle.
    pub fn stop(&self) {
        drop(self.halt());
    }

    /// Cancels the poll loop and waits for its task to finish.
    pub async fn shutdown(&self) {
        let Some(task) = self.halt() else {
            return;
        };
        if let Err(err) = task.await {
            if err.is_panic() {
                error!("remote-config: worker task panicked: {err}");
            }
        }
        // Covers a task dropped before its first poll.
        mark_idle(&self.running);
    }

    /// True from `start` until `stop`, whether or not an iteration ran yet.
    pub fn is_started(&self) -> bool {
        matches!(
            lock(&self.running).state,
            WorkerState::Starting | WorkerState::Started
        )
    }

    /// Current lifecycle state, mostly useful for diagnostics.
    pub fn state(&self) -> WorkerState {
        lock(&self.running).state
    }

    /// Requests cancellation. The state stays `Stopping` until the task exits.
    fn halt(&self) -> Option<JoinHandle<()>> {
        let mut running = lock(&self.running);
        let cancel = running.cancel.take()?;
        cancel.cancel();
        running.state = WorkerState::Stopping;
        debug!("remote-config: worker stopping");
        running.task.take()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Marks the worker idle when the loop exits, including through abort or panic.
struct ExitGuard(Arc<Mutex<Running>>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        mark_idle(&self.0);
    }
}

fn mark_idle(running: &Mutex<Running>) {
    let mut running = lock(running);
    // A restart may already have installed a newer loop.
    if running.state == WorkerState::Stopping && running.cancel.is_none() {
        running.state = WorkerState::Idle;
        debug!("remote-config: worker stopped");
    }
}

async fn poll_loop(
    running: Arc<Mutex<Running>>,
    cancel: CancellationToken,
    interval: Duration,
    iteration: Iteration,
) {
    let _exit = ExitGuard(Arc::clone(&running));
    {
        let mut running = lock(&running);
        // A stop racing the spawn already moved the state on.
        if !cancel.is_cancelled() && running.state == WorkerState::Starting {
            running.state = WorkerState::Started;
        }
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = iteration() => {}
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }
}

fn lock(running: &Mutex<Running>) -> MutexGuard<'_, Running> {
    running.lock().unwrap_or_else(PoisonError::into_inner)
}
