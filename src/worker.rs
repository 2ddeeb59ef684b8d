//! Dedicated background calculation thread.
//!
//! A [`CalculateThread`] owns one OS thread that sleeps until it is handed a
//! task, runs it, and signals completion. The caller overlaps its own work
//! with the background task and only blocks in
//! [`CalculateThread::wait_until_finish`].
//!
//! # Handshake
//!
//! Two one-shot events guarded by a single mutex:
//! - *run*: set by [`CalculateThread::submit`], consumed by the worker
//! - *finish*: set by the worker after the task, consumed by the waiter
//!
//! At most one task is outstanding at a time.
//!
//! # Faults
//!
//! A task that returns `Err` or panics retires the context for good: the
//! error is recorded, the thread exits its loop, and every later submit or
//! wait fails with [`NetworkError::WorkerFault`]. Retired contexts are never
//! handed out again by [`crate::pool::WorkerPool`].

use crate::core::{NetResult, NetworkError};
use log::{debug, trace, warn};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Unit of work executed on the background thread.
pub type Task = Box<dyn FnOnce() -> NetResult<()> + Send + 'static>;

/// Lifecycle of a calculation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Parked in a pool, no owner.
    Idle,
    /// Owned by a caller, waiting for a task.
    Rented,
    /// Running a task.
    Executing,
    /// A task failed; the context is permanently retired.
    Abandoned,
}

static NEXT_WORKER_ID: AtomicUsize = AtomicUsize::new(0);

struct Control {
    state: WorkerState,
    task: Option<Task>,
    run_signal: bool,
    finish_signal: bool,
    outstanding: bool,
    abort: bool,
    fault: Option<String>,
}

struct Shared {
    control: Mutex<Control>,
    run: Condvar,
    finish: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// One reusable unit of background compute capacity.
///
/// Obtained from [`crate::pool::WorkerPool::rent`]. Dropping a context stops
/// its thread and joins it; a task still running is allowed to finish first.
pub struct CalculateThread {
    id: usize,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl fmt::Debug for CalculateThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculateThread")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl CalculateThread {
    /// Start a new thread, parked in the `Idle` state.
    pub(crate) fn spawn() -> NetResult<Self> {
        let id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(Shared {
            control: Mutex::new(Control {
                state: WorkerState::Idle,
                task: None,
                run_signal: false,
                finish_signal: false,
                outstanding: false,
                abort: false,
                fault: None,
            }),
            run: Condvar::new(),
            finish: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("duonet-calc-{id}"))
            .spawn(move || run_loop(id, &thread_shared))
            .map_err(|e| {
                NetworkError::WorkerFault(format!("failed to spawn calculate thread: {e}"))
            })?;

        debug!("calculate thread {id} started");
        Ok(Self {
            id,
            shared,
            handle: Some(handle),
        })
    }

    /// Process-unique id, also part of the OS thread name.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.shared.lock().state
    }

    /// Whether a task failed on this context.
    pub fn is_abandoned(&self) -> bool {
        self.shared.lock().fault.is_some()
    }

    /// Whether a submitted task has not been waited for yet.
    pub fn is_busy(&self) -> bool {
        self.shared.lock().outstanding
    }

    /// Message of the fault that retired this context, if any.
    pub fn fault(&self) -> Option<String> {
        self.shared.lock().fault.clone()
    }

    /// Hand `task` to the background thread.
    ///
    /// Returns immediately; pair every successful submit with
    /// [`CalculateThread::wait_until_finish`].
    ///
    /// # Errors
    /// - `WorkerFault` if a previous task retired this context
    /// - `WorkerBusy` if the previous task has not been waited for
    pub fn submit<F>(&self, task: F) -> NetResult<()>
    where
        F: FnOnce() -> NetResult<()> + Send + 'static,
    {
        self.submit_boxed(Box::new(task))
    }

    fn submit_boxed(&self, task: Task) -> NetResult<()> {
        let mut control = self.shared.lock();
        if let Some(fault) = &control.fault {
            return Err(NetworkError::WorkerFault(fault.clone()));
        }
        if control.outstanding {
            return Err(NetworkError::WorkerBusy);
        }
        control.task = Some(task);
        control.outstanding = true;
        control.finish_signal = false;
        control.run_signal = true;
        self.shared.run.notify_one();
        trace!("calculate thread {} accepted a task", self.id);
        Ok(())
    }

    /// Block until the outstanding task finished.
    ///
    /// Returns `Ok(())` at once when nothing is outstanding.
    ///
    /// # Errors
    /// `WorkerFault` if this or any earlier task failed. A fault recorded by an
    /// earlier task is reported before blocking.
    pub fn wait_until_finish(&self) -> NetResult<()> {
        let mut control = self.shared.lock();
        if let Some(fault) = &control.fault {
            return Err(NetworkError::WorkerFault(fault.clone()));
        }
        while !control.finish_signal {
            if !control.outstanding {
                return Ok(());
            }
            control = self
                .shared
                .finish
                .wait(control)
                .unwrap_or_else(PoisonError::into_inner);
        }
        control.finish_signal = false;
        match &control.fault {
            Some(fault) => Err(NetworkError::WorkerFault(fault.clone())),
            None => Ok(()),
        }
    }

    /// Run `background` on this thread and `inline` on the caller, then wait.
    ///
    /// Unlike [`CalculateThread::submit`], `background` may borrow from the
    /// caller's stack: this function does not return, and does not unwind,
    /// before the background half completed. The inline error wins when both
    /// halves fail.
    pub(crate) fn run_split<'env, B, I, T>(&self, background: B, inline: I) -> NetResult<T>
    where
        B: FnOnce() -> NetResult<()> + Send + 'env,
        I: FnOnce() -> NetResult<T>,
    {
        let task: Box<dyn FnOnce() -> NetResult<()> + Send + 'env> = Box::new(background);
        // SAFETY: only the lifetime bound changes. The boxed closure is either
        // dropped unrun by `submit_boxed` or run to completion by the worker,
        // and `PendingTask` blocks until that completion before this frame is
        // left (normally or by unwinding), so no borrow outlives 'env.
        let task: Task = unsafe {
            std::mem::transmute::<Box<dyn FnOnce() -> NetResult<()> + Send + 'env>, Task>(task)
        };
        self.submit_boxed(task)?;

        let pending = PendingTask {
            worker: self,
            armed: true,
        };
        let inline_result = inline();
        let background_result = pending.finish();

        let value = inline_result?;
        background_result?;
        Ok(value)
    }

    pub(crate) fn rent(&self) {
        let mut control = self.shared.lock();
        if control.fault.is_none() {
            control.state = WorkerState::Rented;
        }
        control.run_signal = false;
        control.finish_signal = false;
    }

    pub(crate) fn revert(&self) {
        let mut control = self.shared.lock();
        if control.fault.is_none() {
            control.state = WorkerState::Idle;
        }
        control.task = None;
        control.run_signal = false;
        control.finish_signal = false;
    }
}

impl Drop for CalculateThread {
    fn drop(&mut self) {
        {
            let mut control = self.shared.lock();
            control.abort = true;
            self.shared.run.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("calculate thread {} did not shut down cleanly", self.id);
            }
        }
        debug!("calculate thread {} retired", self.id);
    }
}

/// Waits for a scoped background task even when the inline half unwinds.
struct PendingTask<'a> {
    worker: &'a CalculateThread,
    armed: bool,
}

impl PendingTask<'_> {
    fn finish(mut self) -> NetResult<()> {
        self.armed = false;
        self.worker.wait_until_finish()
    }
}

impl Drop for PendingTask<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.worker.wait_until_finish();
        }
    }
}

fn run_loop(id: usize, shared: &Shared) {
    loop {
        let task = {
            let mut control = shared.lock();
            while !control.run_signal && !control.abort {
                control = shared
                    .run
                    .wait(control)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if control.abort {
                break;
            }
            control.run_signal = false;
            let Some(task) = control.task.take() else {
                continue;
            };
            control.state = WorkerState::Executing;
            task
        };

        let fault = match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };

        let mut control = shared.lock();
        control.outstanding = false;
        control.finish_signal = true;
        match fault {
            None => control.state = WorkerState::Rented,
            Some(message) => {
                warn!("calculate thread {id} abandoned: {message}");
                control.fault = Some(message);
                control.state = WorkerState::Abandoned;
                control.abort = true;
            }
        }
        shared.finish.notify_all();
        if control.abort {
            break;
        }
    }
    trace!("calculate thread {id} left its run loop");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("task panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("task panicked: {message}")
    } else {
        "task panicked".to_string()
    }
}
