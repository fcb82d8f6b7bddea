//! Cancellable, suspendable background workers.
//!
//! ## Learning: Cooperative Control
//!
//! A [`Worker`] owns one OS thread that calls its [`Job`] over and over.
//! The foreground never interrupts a call in progress. Instead it flips
//! flags that the loop checks *between* calls:
//!
//! ```text
//!            run()            suspend()
//! Unstarted ──────► Running ◄──────────► Suspended
//!                      │        resume()      │
//!                      └──── abort() ─────────┴──► Cancelled ──► Stopped
//! ```
//!
//! - Cancellation is a `tokio_util` [`CancellationToken`]
//! - Suspension and idling block on a `parking_lot` [`Condvar`], so a
//!   parked worker costs nothing until something wakes it
//! - [`Worker::suspend_wait`] returns only once the loop has parked, which
//!   makes "suspend, swap shared state, resume" safe against a half-done
//!   work unit

pub mod bracket;
pub mod keyword;
pub mod queue;

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

pub use bracket::{Bracket, BracketKind, BracketWorker};
pub use keyword::KeywordWorker;
pub use queue::IntervalQueue;

/// Lifecycle of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Unstarted,
    Running,
    Suspended,
    /// Abort requested; the thread is winding down
    Cancelled,
    Stopped,
}

/// What a work unit found to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// Did something; call again right away
    Busy,
    /// Nothing to do; park until woken
    Idle,
}

/// Errors returned by worker control operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker thread is already running")]
    AlreadyRunning,

    #[error("Worker was aborted and cannot run again")]
    Terminated,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// The work a [`Worker`] performs.
pub trait Job: Send + 'static {
    /// Handed to [`Job::start`] by [`Worker::run`].
    type Args: Send + 'static;

    /// Runs once on the worker thread before the first work unit.
    fn start(&mut self, _args: Self::Args) {}

    /// One discrete unit of work.
    fn work(&mut self, cx: &WorkContext<'_>) -> WorkStatus;
}

#[derive(Debug, Default)]
struct ControlState {
    suspend_requested: bool,
    /// The loop is parked on a suspend request
    acknowledged: bool,
    /// Something arrived since the last work unit started
    wake_pending: bool,
    /// The last work unit found nothing and nothing arrived since
    idle: bool,
    running: bool,
    spawned: bool,
}

#[derive(Debug, Default)]
struct Control {
    state: Mutex<ControlState>,
    changed: Condvar,
    cancel: CancellationToken,
}

impl Control {
    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// What a running job can ask about its worker.
pub struct WorkContext<'a> {
    control: &'a Control,
}

impl WorkContext<'_> {
    /// True when the job should stop early and return.
    pub fn should_yield(&self) -> bool {
        self.control.is_cancelled() || self.control.state.lock().suspend_requested
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }
}

/// Marks the loop as finished, even if the job panicked.
struct RunningGuard(Arc<Control>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let mut state = self.0.state.lock();
        state.running = false;
        state.acknowledged = false;
        self.0.changed.notify_all();
    }
}

/// A background thread driving a [`Job`].
pub struct Worker<J: Job> {
    name: String,
    job: Arc<Mutex<J>>,
    control: Arc<Control>,
    handle: Mutex<Option<JoinHandle<()>>>,
    idle_poll: Duration,
}

impl<J: Job> Worker<J> {
    /// Creates a worker. Nothing runs until [`Worker::run`].
    ///
    /// `idle_poll` bounds how long an idle loop sleeps without a wake-up.
    pub fn new(name: impl Into<String>, job: J, idle_poll: Duration) -> Self {
        Self {
            name: name.into(),
            job: Arc::new(Mutex::new(job)),
            control: Arc::new(Control::default()),
            handle: Mutex::new(None),
            idle_poll,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts the worker thread.
    ///
    /// Fails with `AlreadyRunning` while a previous thread is alive and
    /// with `Terminated` once the worker has been aborted.
    pub fn run(&self, args: J::Args) -> Result<(), WorkerError> {
        let mut handle = self.handle.lock();
        if self.control.is_cancelled() {
            return Err(WorkerError::Terminated);
        }
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(WorkerError::AlreadyRunning);
        }

        {
            let mut state = self.control.state.lock();
            state.running = true;
            state.spawned = true;
            state.idle = false;
            state.acknowledged = false;
        }

        let job = Arc::clone(&self.job);
        let control = Arc::clone(&self.control);
        let idle_poll = self.idle_poll;
        let name = self.name.clone();

        let spawned = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let _guard = RunningGuard(Arc::clone(&control));
                tracing::info!("Worker {} started", name);
                job.lock().start(args);
                run_loop(&job, &control, idle_poll);
                tracing::info!("Worker {} stopped", name);
            });

        match spawned {
            Ok(h) => {
                *handle = Some(h);
                Ok(())
            }
            Err(e) => {
                self.control.state.lock().running = false;
                Err(WorkerError::Spawn(e))
            }
        }
    }

    /// Requests cooperative cancellation. Ignored if no thread is alive.
    pub fn abort(&self) {
        let state = self.control.state.lock();
        if !state.running {
            return;
        }
        self.control.cancel.cancel();
        self.control.changed.notify_all();
    }

    /// Asks the loop to park before its next work unit.
    pub fn suspend(&self) {
        let mut state = self.control.state.lock();
        state.suspend_requested = true;
        self.control.changed.notify_all();
    }

    /// Lets a suspended loop continue.
    pub fn resume(&self) {
        let mut state = self.control.state.lock();
        state.suspend_requested = false;
        self.control.changed.notify_all();
    }

    /// Suspends and blocks until the loop has parked.
    ///
    /// Returns at once when no thread is alive. There is no timeout: the
    /// wait lasts as long as the work unit in progress.
    pub fn suspend_wait(&self) {
        let mut state = self.control.state.lock();
        state.suspend_requested = true;
        self.control.changed.notify_all();
        while state.running && !state.acknowledged && !self.control.is_cancelled() {
            self.control.changed.wait(&mut state);
        }
    }

    /// Whether a suspension has been requested and not yet lifted.
    pub fn is_suspend_requested(&self) -> bool {
        self.control.state.lock().suspend_requested
    }

    /// Tells an idle loop that new work has arrived.
    pub fn wake(&self) {
        let mut state = self.control.state.lock();
        state.wake_pending = true;
        state.idle = false;
        self.control.changed.notify_all();
    }

    /// Blocks until the loop reports an idle cycle after the last
    /// [`Worker::wake`], or until `timeout` passes. Returns whether it went
    /// idle. Returns `false` at once if no thread is alive.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.control.state.lock();
        while !state.idle {
            if !state.running {
                return false;
            }
            if self.control.changed.wait_until(&mut state, deadline).timed_out() {
                return state.idle;
            }
        }
        true
    }

    pub fn state(&self) -> WorkerState {
        let state = self.control.state.lock();
        match (state.spawned, state.running) {
            (false, _) => WorkerState::Unstarted,
            (true, false) => WorkerState::Stopped,
            (true, true) if self.control.is_cancelled() => WorkerState::Cancelled,
            (true, true) if state.acknowledged => WorkerState::Suspended,
            (true, true) => WorkerState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.control.state.lock().running
    }

    /// Runs `f` with exclusive access to the job.
    ///
    /// Blocks while a work unit is in progress.
    pub fn with_job<R>(&self, f: impl FnOnce(&mut J) -> R) -> R {
        f(&mut self.job.lock())
    }

    /// Aborts and waits for the thread to exit.
    pub fn join(&self) {
        self.abort();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != std::thread::current().id() && handle.join().is_err() {
                tracing::warn!("Worker {} panicked", self.name);
            }
        }
    }
}

impl<J: Job> Drop for Worker<J> {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_loop<J: Job>(job: &Mutex<J>, control: &Control, idle_poll: Duration) {
    let cx = WorkContext { control };

    while !control.is_cancelled() {
        {
            let mut state = control.state.lock();
            if state.suspend_requested {
                state.acknowledged = true;
                state.idle = false;
                control.changed.notify_all();
                while state.suspend_requested && !control.is_cancelled() {
                    control.changed.wait(&mut state);
                }
                state.acknowledged = false;
                continue;
            }
            state.wake_pending = false;
        }

        let status = job.lock().work(&cx);

        if status == WorkStatus::Idle {
            let mut state = control.state.lock();
            if !state.wake_pending && !state.suspend_requested && !control.is_cancelled() {
                state.idle = true;
                control.changed.notify_all();
                control.changed.wait_for(&mut state, idle_poll);
            }
        }
    }
}
