// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The thread-pool executor.
//!
//! A [`ThreadPool`] owns a set of OS worker threads draining one shared
//! injector queue. [`Executor`] is the cheap, cloneable posting handle;
//! anything that can be boxed as a callable can be posted, and posting never
//! fails. Workers that run out of work turn the pool [`Timer`] and park
//! until the next timer deadline.

use crate::frame::{self, Frame};
use crate::loom::sync::atomic::{AtomicBool, Ordering};
use crate::loom::sync::mpsc;
use crate::loom::sync::{Arc, Condvar, Mutex};
use crate::runner::SerialRunner;
use crate::time::timer::{Timer, TimerEntry};
use core::fmt;
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::thread;
use std::time::Instant;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size pool of worker threads.
///
/// Dropping the pool stops and joins all workers; callables still queued at
/// that point are dropped, which cancels any coroutine frames they were
/// about to resume.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
}

/// Posting handle to a [`ThreadPool`].
///
/// Two executors compare equal iff they refer to the same pool.
#[derive(Clone)]
pub struct Executor {
    shared: Arc<Shared>,
}

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    available: Condvar,
    timer: Timer,
    stop: AtomicBool,
    num_workers: usize,
}

// === impl ThreadPool ===

impl ThreadPool {
    /// Spawns a pool with `num_workers` OS threads.
    ///
    /// # Panics
    ///
    /// Panics if `num_workers` is zero.
    pub fn new(num_workers: usize) -> Self {
        assert!(num_workers > 0, "a thread pool needs at least one worker");

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            timer: Timer::new(),
            stop: AtomicBool::new(false),
            num_workers,
        });

        let workers = (0..num_workers)
            .map(|id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("filament-worker-{id}"))
                    .spawn(move || worker_main(&shared, id))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { shared, workers }
    }

    /// Returns a posting handle to this pool.
    pub fn executor(&self) -> Executor {
        Executor {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Signals all workers to shut down once they finish their current
    /// callable. Queued callables that never ran are dropped.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.available.notify_all();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        // anything still queued will never run; drop it so frame cleanup
        // (and with it awaiter cancellation) happens deterministically
        self.shared.queue.lock().unwrap().clear();
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_workers", &self.shared.num_workers)
            .finish_non_exhaustive()
    }
}

// === impl Executor ===

impl Executor {
    /// Schedules `f` for eventual execution on some worker thread.
    ///
    /// Posting never fails; the queue is unbounded. FIFO among direct posts,
    /// but distinct callables may run in parallel on different workers.
    pub fn post(&self, f: impl FnOnce() + Send + 'static) {
        self.post_job(Box::new(f));
    }

    pub(crate) fn post_job(&self, job: Job) {
        self.shared.queue.lock().unwrap().push_back(job);
        self.shared.available.notify_one();
    }

    /// `true` iff the pool has exactly one worker, i.e. the executor is
    /// already a serialization domain by itself.
    pub fn is_serial(&self) -> bool {
        self.shared.num_workers == 1
    }

    /// The executor of the coroutine currently being polled on this thread,
    /// if any.
    pub fn try_current() -> Option<Executor> {
        frame::current().map(|frame| frame.runner().inner().clone())
    }

    /// The executor of the coroutine currently being polled on this thread.
    ///
    /// # Panics
    ///
    /// Panics when called from outside a runtime context.
    #[track_caller]
    pub fn current() -> Executor {
        Executor::try_current().expect("no runtime context on this thread")
    }

    pub(crate) fn register_timer(&self, entry: &Arc<TimerEntry>) {
        if self.shared.timer.register(entry) {
            // the new entry is the earliest deadline; parked workers are
            // waiting on a stale timeout
            self.shared.available.notify_all();
        }
    }
}

impl PartialEq for Executor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Executor {}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("addr", &Arc::as_ptr(&self.shared))
            .field("num_workers", &self.shared.num_workers)
            .finish()
    }
}

// === worker loop ===

fn worker_main(shared: &Shared, id: usize) {
    let _span = tracing::debug_span!("worker", worker = id).entered();

    loop {
        let job = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if shared.stop.load(Ordering::Acquire) {
                    tracing::debug!("stop signal received, shutting down");
                    return;
                }

                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }

                match shared.timer.next_deadline() {
                    Some(deadline) => {
                        let now = Instant::now();
                        if deadline <= now {
                            // a sleep is due; turn the timer outside the
                            // queue lock
                            break None;
                        }
                        cfg_if::cfg_if! {
                            if #[cfg(loom)] {
                                queue = shared.available.wait(queue).unwrap();
                            } else {
                                let (guard, _timed_out) = shared
                                    .available
                                    .wait_timeout(queue, deadline - now)
                                    .unwrap();
                                queue = guard;
                            }
                        }
                    }
                    None => {
                        tracing::trace!("out of work, parking");
                        queue = shared.available.wait(queue).unwrap();
                    }
                }
            }
        };

        match job {
            Some(job) => job(),
            None => {
                let expired = shared.timer.turn(Instant::now());
                tracing::trace!(expired, "turned timer");
            }
        }
    }
}

// === entry points ===

/// Drives `future` to completion on `executor`, blocking the calling thread.
///
/// The future runs inside a fresh [`SerialRunner`] over `executor`; the
/// calling thread parks until the result comes back. A panic inside the
/// future resumes unwinding on the caller.
///
/// # Panics
///
/// Panics if the pool shuts down before the future completes.
#[track_caller]
pub fn block_on<F>(executor: &Executor, future: F) -> F::Output
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    let entry = Box::pin(async move {
        let result = AssertUnwindSafe(future).catch_unwind().await;
        // the receiver disappearing means the caller is gone; nothing to do
        let _ = tx.send(result);
    });

    let frame = Frame::new(entry, SerialRunner::new(executor.clone()));
    frame.schedule();

    match rx.recv() {
        Ok(Ok(value)) => value,
        Ok(Err(payload)) => resume_unwind(payload),
        Err(_) => panic!("thread pool shut down while block_on was pending"),
    }
}

/// Runs `future` on a freshly constructed thread pool sized to the
/// machine's available parallelism, tearing the pool down afterwards.
#[track_caller]
pub fn run<F>(future: F) -> F::Output
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let num_workers = thread::available_parallelism().map_or(1, usize::from);
    let pool = ThreadPool::new(num_workers);
    block_on(&pool.executor(), future)
}
