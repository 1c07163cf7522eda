// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::executor::{Executor, Job};
use crate::loom::sync::{Arc, Mutex};
use core::fmt;
use std::collections::VecDeque;

/// How many queued callables a single drain pass may run before re-posting
/// itself, so a busy strand cannot monopolize a pool worker.
const DRAIN_BATCH: usize = 256;

/// A serialization domain over a (possibly multi-threaded) [`Executor`].
///
/// Callables posted to the same strand run serially, in submission order, on
/// whatever pool thread picks the strand up. Callables posted to distinct
/// strands may run in parallel. A callable posted from inside a strand
/// callable goes through the queue like any other; there is no inline
/// re-entry.
#[derive(Clone)]
pub struct Strand {
    inner: Arc<Inner>,
}

struct Inner {
    executor: Executor,
    queue: Mutex<Queue>,
}

struct Queue {
    jobs: VecDeque<Job>,
    /// Whether a drain pass is queued or running on the pool. At most one at
    /// any time; this is what makes the strand serial.
    draining: bool,
}

// === impl Strand ===

impl Strand {
    pub fn new(executor: Executor) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                queue: Mutex::new(Queue {
                    jobs: VecDeque::new(),
                    draining: false,
                }),
            }),
        }
    }

    /// The underlying executor this strand serializes over.
    pub fn executor(&self) -> &Executor {
        &self.inner.executor
    }

    /// Posts `f` to the strand. Never fails, never runs inline.
    pub fn post(&self, f: impl FnOnce() + Send + 'static) {
        self.post_job(Box::new(f));
    }

    pub(crate) fn post_job(&self, job: Job) {
        let start_drain = {
            let mut queue = self.inner.queue.lock().unwrap();
            queue.jobs.push_back(job);
            if queue.draining {
                false
            } else {
                queue.draining = true;
                true
            }
        };

        if start_drain {
            let strand = self.clone();
            self.inner.executor.post(move || strand.drain());
        }
    }

    /// Identity of the serialization domain.
    pub(crate) fn same(&self, other: &Strand) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn drain(&self) {
        for _ in 0..DRAIN_BATCH {
            let job = {
                let mut queue = self.inner.queue.lock().unwrap();
                match queue.jobs.pop_front() {
                    Some(job) => job,
                    None => {
                        queue.draining = false;
                        return;
                    }
                }
            };
            job();
        }

        // batch exhausted with work left over; yield the worker and continue
        // in a fresh pass
        let more = {
            let mut queue = self.inner.queue.lock().unwrap();
            if queue.jobs.is_empty() {
                queue.draining = false;
                false
            } else {
                true
            }
        };
        if more {
            let strand = self.clone();
            self.inner.executor.post(move || strand.drain());
        }
    }
}

impl fmt::Debug for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strand")
            .field("addr", &Arc::as_ptr(&self.inner))
            .field("executor", &self.inner.executor)
            .finish()
    }
}
