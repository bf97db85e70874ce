//! Repeating background task lifecycle.
//!
//! A task is started once, ticks on a fixed interval on the tokio runtime it
//! was given, and stops cooperatively: cancellation is checked between ticks,
//! an in-flight tick always runs to completion.

use log::{error, info, log_enabled, warn, Level};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum TaskState {
    /// Constructed, never started
    Idle = 0,
    /// Ticking periodically
    Running = 1,
    /// Stopped by request or by a fatal tick
    Stopped = 2,
}

impl From<i32> for TaskState {
    fn from(value: i32) -> Self {
        match value {
            1 => TaskState::Running,
            2 => TaskState::Stopped,
            _ => TaskState::Idle,
        }
    }
}

/// What the worker does after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    /// Fatal condition, end the loop.
    Stop,
}

/// Progress counters shared between the worker and observers.
#[derive(Debug, Default)]
pub struct TaskProgress {
    progress: AtomicU64,
    ticks: AtomicU64,
    complete: AtomicBool,
}

impl TaskProgress {
    /// Raise progress to `value` if it is higher. Never decreases.
    pub fn advance(&self, value: u64) -> u64 {
        self.progress.fetch_max(value, Ordering::AcqRel).max(value)
    }

    pub fn progress(&self) -> u64 {
        self.progress.load(Ordering::Acquire)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::AcqRel);
    }

    fn set_complete(&self, complete: bool) {
        self.complete.store(complete, Ordering::Release);
    }
}

struct Worker {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// A fixed-interval task driven by one tokio worker.
pub struct RepeatingTask {
    name: &'static str,
    interval: Duration,
    runtime: Handle,
    state: Arc<AtomicI32>,
    progress: Arc<TaskProgress>,
    worker: Mutex<Option<Worker>>,
}

impl RepeatingTask {
    pub fn new(name: &'static str, interval: Duration, runtime: Handle) -> Self {
        Self {
            name,
            interval,
            runtime,
            state: Arc::new(AtomicI32::new(TaskState::Idle as i32)),
            progress: Arc::new(TaskProgress::default()),
            worker: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> TaskState {
        TaskState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    pub fn progress(&self) -> &Arc<TaskProgress> {
        &self.progress
    }

    /// Start ticking. Returns false if a worker is already alive.
    ///
    /// The first tick fires immediately, later ones every `interval`.
    pub fn start<F>(&self, tick: F) -> bool
    where
        F: Fn() -> TickControl + Send + Sync + 'static,
    {
        let mut worker = match self.worker.lock() {
            Ok(worker) => worker,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(current) = worker.as_ref() {
            if !current.handle.is_finished() {
                if current.cancel_token.is_cancelled() {
                    warn!("{} is still finishing its last tick, start ignored", self.name);
                }
                return false;
            }
        }

        let cancel_token = CancellationToken::new();
        self.progress.set_complete(false);
        self.state.store(TaskState::Running as i32, Ordering::Release);

        let handle = self.runtime.spawn(Self::run_loop(
            self.name,
            self.interval,
            Arc::new(tick),
            cancel_token.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.progress),
        ));

        *worker = Some(Worker { cancel_token, handle });
        info!("{} started, interval {:?}", self.name, self.interval);
        true
    }

    /// Request a stop. The in-flight tick, if any, still completes.
    pub fn stop(&self) {
        let worker = match self.worker.lock() {
            Ok(worker) => worker,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(current) = worker.as_ref() {
            current.cancel_token.cancel();
        }
    }

    /// Request a stop and wait for the worker to exit.
    pub async fn stop_and_wait(&self) {
        let current = {
            let mut worker = match self.worker.lock() {
                Ok(worker) => worker,
                Err(poisoned) => poisoned.into_inner(),
            };
            worker.take()
        };

        if let Some(current) = current {
            current.cancel_token.cancel();
            if let Err(e) = current.handle.await {
                error!("{} worker ended abnormally: {}", self.name, e);
            }
        }
    }

    async fn run_loop<F>(
        name: &'static str,
        interval: Duration,
        tick: Arc<F>,
        cancel_token: CancellationToken,
        state: Arc<AtomicI32>,
        progress: Arc<TaskProgress>,
    ) where
        F: Fn() -> TickControl + Send + Sync + 'static,
    {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                _ = timer.tick() => {},
            }

            // Collaborators may block, keep them off the async workers.
            let tick = Arc::clone(&tick);
            match tokio::task::spawn_blocking(move || tick()).await {
                Ok(TickControl::Continue) => progress.record_tick(),
                Ok(TickControl::Stop) => {
                    progress.record_tick();
                    error!("{} hit a fatal error, stopping", name);
                    break;
                },
                Err(e) => {
                    error!("{} tick panicked: {}", name, e);
                    break;
                },
            }
        }

        state.store(TaskState::Stopped as i32, Ordering::Release);
        progress.set_complete(true);

        if log_enabled!(Level::Debug) {
            info!("{} stopped after {} ticks", name, progress.ticks());
        }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.stop();
    }
}
