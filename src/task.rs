// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Concurrently running units of work.
//!
//! A [`Task`] is a coroutine promoted to run on its own serialization
//! domain, managed through a shared control block. The handle joins the
//! task's outcome (once), requests cooperative cancellation via
//! [`Task::abort`] or an [`AbortHandle`], or [detaches][Task::detach] the
//! task to run to completion unobserved. Dropping an unfinished,
//! undetached handle aborts the task.

mod id;
mod switch_to;
mod yield_now;

use crate::error::JoinError;
use crate::executor::Executor;
use crate::frame::{self, Frame};
use crate::loom::sync::{Arc, Mutex};
use crate::runner::SerialRunner;
use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::Instrument;

pub use id::Id;
pub use switch_to::{SwitchTo, switch_to};
pub use yield_now::{YieldNow, yield_now};

/// Handle to a concurrently running coroutine.
///
/// Created by the [`spawn`] family of functions. Awaiting the handle joins
/// the task: it yields `Ok` with the body's output, [`JoinError::Panicked`]
/// if the body panicked, or [`JoinError::Cancelled`] if the task was aborted
/// before it could record a result. A task supports exactly one join;
/// polling the handle after the outcome was taken is a programmer error.
#[must_use = "dropping a Task aborts it; detach() to let it run unobserved"]
pub struct Task<T: Send + 'static> {
    state: Arc<SharedState<T>>,
    abort_on_drop: bool,
}

/// Lightweight cancellation handle to a [`Task`], usable from any thread.
pub struct AbortHandle<T: Send + 'static> {
    state: Arc<SharedState<T>>,
}

pub(crate) struct SharedState<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    /// The driving frame. `None` is the definition of "finished".
    frame: Option<Arc<Frame>>,
    result: Option<Result<T, JoinError>>,
    /// Set by the abort chaser when it tears the task down before a result
    /// was recorded.
    cancelled: bool,
    /// At most one consumer awaits the task; a re-registration replaces the
    /// previous waker.
    waiter: Option<Waker>,
    requested_abort: bool,
    /// The joined outcome was handed out.
    taken: bool,
}

// === spawn functions ===

/// Spawns `future` as a [`Task`] on a sibling serialization domain of the
/// calling coroutine: same pool, independent strand.
///
/// # Panics
///
/// Panics when called from outside a runtime context; use [`spawn_on`]
/// there.
#[track_caller]
pub fn spawn<F>(future: F) -> Task<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let frame = frame::current().expect("spawn must be called from within a runtime");
    spawn_with_runner(frame.runner().fork(), future)
}

/// Spawns `future` as a [`Task`] on a fresh serialization domain over
/// `executor`.
#[track_caller]
pub fn spawn_on<F>(executor: &Executor, future: F) -> Task<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    spawn_with_runner(SerialRunner::new(executor.clone()), future)
}

/// Spawns `future` and detaches it: the task runs to completion (or until
/// the pool shuts down) with its outcome unobservable.
#[track_caller]
pub fn spawn_background<F>(future: F)
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    spawn(future).detach();
}

/// [`spawn_background`] for use outside a runtime context.
#[track_caller]
pub fn spawn_background_on<F>(executor: &Executor, future: F)
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    spawn_on(executor, future).detach();
}

/// Spawns `future` as a [`Task`] serialized by `runner`.
#[track_caller]
pub fn spawn_with_runner<F>(runner: SerialRunner, future: F) -> Task<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let id = Id::next();
    let span = tracing::trace_span!(
        "task",
        task.tid = id.as_u64(),
        task.output = %core::any::type_name::<F::Output>(),
    );

    let state = Arc::new(SharedState {
        inner: Mutex::new(Inner {
            frame: None,
            result: None,
            cancelled: false,
            waiter: None,
            requested_abort: false,
            taken: false,
        }),
    });

    let entry = {
        let state = Arc::clone(&state);
        async move {
            let result = AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .map_err(JoinError::panicked);

            let waiter = {
                let mut inner = state.inner.lock().unwrap();
                debug_assert!(inner.result.is_none(), "task result recorded twice");
                inner.result = Some(result);
                inner.frame = None;
                inner.waiter.take()
            };
            if let Some(waiter) = waiter {
                waiter.wake();
            }
        }
    };

    let frame = Frame::new(Box::pin(entry.instrument(span)), runner);
    state.inner.lock().unwrap().frame = Some(Arc::clone(&frame));
    frame.schedule();

    Task {
        state,
        abort_on_drop: true,
    }
}

// === impl SharedState ===

impl<T: Send + 'static> SharedState<T> {
    /// Requests cooperative cancellation.
    ///
    /// Returns `true` on the first effective request. Returns `false` when
    /// the task already finished or an abort was already requested.
    fn request_abort(self: &Arc<Self>) -> bool {
        let runner = {
            let mut inner = self.inner.lock().unwrap();
            if inner.requested_abort {
                return false;
            }
            let Some(frame) = &inner.frame else {
                return false;
            };
            // freeze the frame so it cannot keep migrating ahead of the
            // chaser, then tear it down on whatever strand owns it
            frame.mark_cancel();
            let runner = frame.runner();
            inner.requested_abort = true;
            runner
        };

        tracing::debug!("abort requested");
        let state = Arc::clone(self);
        let via = runner.clone();
        runner.post(move || chase(&state, &via));
        true
    }
}

/// The abort chaser. Runs on what it believes to be the task's current
/// serialization domain; if the task migrated in the meantime it re-posts
/// itself to the new domain and tries again. The frame was frozen when the
/// abort was requested, so it stops moving and the chaser converges.
fn chase<T: Send + 'static>(state: &Arc<SharedState<T>>, via: &SerialRunner) {
    let future = {
        let mut inner = state.inner.lock().unwrap();
        let Some(frame) = inner.frame.clone() else {
            // finished while the chaser was in flight
            return;
        };

        let curr = frame.runner();
        if !curr.same_serialization(via) {
            drop(inner);
            tracing::trace!("task migrated, re-posting abort chaser");
            repost_chase(state, curr);
            return;
        }

        match frame.try_take_future() {
            Err(_) => {
                // the poll that was in flight when the freeze hit has not
                // settled yet (it may be finishing on a strand the frame
                // migrated away from); no new poll can start, so one more
                // queue round trip is enough
                drop(inner);
                tracing::trace!("frame still mid-poll, re-posting abort chaser");
                repost_chase(state, curr);
                return;
            }
            Ok(future) => {
                debug_assert!(future.is_some(), "unfinished task frame without a future");
                future
            }
        }
    };

    // dropping the entry future runs the drop glue of every suspended
    // awaiter, innermost first, cancelling in-flight timers and operations.
    // This happens outside the state lock, and before the task is marked
    // finished, so every cancellation signal precedes the finished
    // transition.
    drop(future);
    tracing::debug!("task aborted");

    let waiter = {
        let mut inner = state.inner.lock().unwrap();
        inner.frame = None;
        inner.cancelled = true;
        inner.waiter.take()
    };
    if let Some(waiter) = waiter {
        waiter.wake();
    }
}

fn repost_chase<T: Send + 'static>(state: &Arc<SharedState<T>>, runner: SerialRunner) {
    let state = Arc::clone(state);
    let via = runner.clone();
    runner.post(move || chase(&state, &via));
}

// === impl Task ===

impl<T: Send + 'static> Task<T> {
    /// `true` once the task ran to completion, panicked, or was aborted.
    pub fn is_finished(&self) -> bool {
        self.state.inner.lock().unwrap().frame.is_none()
    }

    /// `true` iff the task was torn down by an abort before it could record
    /// a result.
    pub fn is_cancelled(&self) -> bool {
        self.state.inner.lock().unwrap().cancelled
    }

    /// Requests cooperative cancellation of the task.
    ///
    /// Returns `true` on the first effective request; `false` when the task
    /// has already finished or an abort is already in flight. Cancellation
    /// is asynchronous: the teardown happens on the task's own strand, and
    /// chases the task if it migrates executors concurrently.
    pub fn abort(&self) -> bool {
        self.state.request_abort()
    }

    /// A cloneable handle that can request an abort without joining rights.
    pub fn abort_handle(&self) -> AbortHandle<T> {
        AbortHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Consumes the handle without aborting; the task keeps running and its
    /// outcome becomes unobservable.
    pub fn detach(mut self) {
        self.abort_on_drop = false;
    }
}

impl<T: Send + 'static> Future for Task<T> {
    type Output = Result<T, JoinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.state.inner.lock().unwrap();

        if inner.frame.is_some() {
            inner.waiter = Some(cx.waker().clone());
            return Poll::Pending;
        }

        assert!(!inner.taken, "task polled after its outcome was taken");
        inner.taken = true;
        match inner.result.take() {
            Some(result) => Poll::Ready(result),
            None => Poll::Ready(Err(JoinError::Cancelled)),
        }
    }
}

impl<T: Send + 'static> Unpin for Task<T> {}

impl<T: Send + 'static> Drop for Task<T> {
    fn drop(&mut self) {
        if self.abort_on_drop {
            self.state.request_abort();
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.state.inner.lock().unwrap();
        f.debug_struct("Task")
            .field("finished", &inner.frame.is_none())
            .field("cancelled", &inner.cancelled)
            .finish_non_exhaustive()
    }
}

// === impl AbortHandle ===

impl<T: Send + 'static> AbortHandle<T> {
    /// See [`Task::abort`].
    pub fn abort(&self) -> bool {
        self.state.request_abort()
    }

    /// See [`Task::is_finished`].
    pub fn is_finished(&self) -> bool {
        self.state.inner.lock().unwrap().frame.is_none()
    }
}

impl<T: Send + 'static> Clone for AbortHandle<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Send + 'static> fmt::Debug for AbortHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortHandle").finish_non_exhaustive()
    }
}
