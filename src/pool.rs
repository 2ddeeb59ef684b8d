//! Recycling pool for [`CalculateThread`] contexts.
//!
//! # Motivation
//!
//! Spawning an OS thread per network (or per pass) is wasteful. The pool keeps
//! at most one idle context around so that the next network asking for
//! parallel capacity can reuse it instead of spawning.
//!
//! # Thread Safety
//!
//! `WorkerPool` is a cheap cloneable handle around `Arc<Mutex<..>>`; clones
//! share the same slot and can be handed to networks on different threads.
//! There is no process-wide pool: whoever creates the pool owns its lifecycle
//! and can [`WorkerPool::drain`] it.

use crate::core::{NetResult, NetworkError};
use crate::worker::CalculateThread;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct PoolInner {
    /// The single idle slot.
    idle: Option<CalculateThread>,
    /// Total contexts ever spawned by this pool (for diagnostics)
    spawned: usize,
    /// Number of times `rent()` was satisfied from the slot
    recycled: usize,
    /// Contexts dropped because the slot was full or they were abandoned
    retired: usize,
}

/// Statistics from the worker pool for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Contexts spawned over the pool's lifetime
    pub spawned: usize,
    /// `rent()` calls satisfied by the idle slot
    pub recycled: usize,
    /// Contexts retired instead of being cached
    pub retired: usize,
    /// Number of idle contexts currently cached (0 or 1)
    pub available: usize,
}

/// Capacity-1 pool of idle calculation threads.
#[derive(Clone, Default)]
pub struct WorkerPool {
    inner: Arc<Mutex<PoolInner>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("stats", &self.stats())
            .finish()
    }
}

#[allow(clippy::must_use_candidate)]
impl WorkerPool {
    /// Create an empty pool. Contexts are spawned on first `rent()`.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the idle context, or spawn a fresh one if the slot is empty.
    ///
    /// An abandoned context found in the slot is discarded, never handed out.
    ///
    /// # Errors
    /// `WorkerFault` if a new thread cannot be spawned.
    pub fn rent(&self) -> NetResult<CalculateThread> {
        let cached = {
            let mut inner = self.lock();
            match inner.idle.take() {
                Some(worker) if !worker.is_abandoned() => {
                    inner.recycled += 1;
                    Some(worker)
                }
                Some(abandoned) => {
                    inner.retired += 1;
                    drop(inner);
                    drop(abandoned);
                    None
                }
                None => None,
            }
        };

        let worker = match cached {
            Some(worker) => {
                debug!("recycled calculate thread {}", worker.id());
                worker
            }
            None => {
                let worker = CalculateThread::spawn()?;
                self.lock().spawned += 1;
                worker
            }
        };
        worker.rent();
        Ok(worker)
    }

    /// Give a rented context back.
    ///
    /// Waits for any outstanding task first. The context is cached when the
    /// slot is free and retired (its thread joined) otherwise.
    ///
    /// # Errors
    /// `WorkerFault` if the context is abandoned; it is retired in that case.
    pub fn release(&self, worker: CalculateThread) -> NetResult<()> {
        if let Err(err) = worker.wait_until_finish() {
            self.lock().retired += 1;
            return Err(err);
        }
        if let Some(fault) = worker.fault() {
            self.lock().retired += 1;
            return Err(NetworkError::WorkerFault(fault));
        }

        let surplus = {
            let mut inner = self.lock();
            if inner.idle.is_none() {
                worker.revert();
                debug!("calculate thread {} parked in pool", worker.id());
                inner.idle = Some(worker);
                None
            } else {
                inner.retired += 1;
                Some(worker)
            }
        };
        // Joined outside the lock.
        drop(surplus);
        Ok(())
    }

    /// Retire the cached idle context, if any.
    pub fn drain(&self) {
        let idle = {
            let mut inner = self.lock();
            let idle = inner.idle.take();
            if idle.is_some() {
                inner.retired += 1;
            }
            idle
        };
        drop(idle);
    }

    /// Number of idle contexts currently cached (0 or 1).
    pub fn available(&self) -> usize {
        usize::from(self.lock().idle.is_some())
    }

    /// Get pool statistics.
    pub fn stats(&self) -> PoolStats {
        let inner = self.lock();
        PoolStats {
            spawned: inner.spawned,
            recycled: inner.recycled,
            retired: inner.retired,
            available: usize::from(inner.idle.is_some()),
        }
    }
}
