// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The frame driver.
//!
//! A [`Frame`] is the heap control block of one driven coroutine chain: the
//! top-level future plus the [`SerialRunner`] it currently belongs to. The
//! frame's waker re-posts a poll of the frame onto that runner, so the
//! future is only ever polled inside its serialization domain, one poll at a
//! time. A small state machine under the frame mutex serializes wake-ups
//! against in-flight polls and lets a wake that arrives mid-poll reschedule
//! the frame instead of being lost.
//!
//! While a frame is being polled it is installed as the thread's current
//! frame; that ambient context is what `Executor::current`, `spawn`,
//! `switch_to` and the ambient sleeps read.

use crate::loom::sync::atomic::{AtomicBool, Ordering};
use crate::loom::sync::{Arc, Mutex, Weak};
use crate::runner::SerialRunner;
use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};
use std::cell::RefCell;
use std::task::Wake;

pub(crate) type EntryFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub(crate) struct Frame {
    core: Mutex<Core>,
    waker: Waker,
    /// Once set, the frame is never polled again: it stays parked on its
    /// current runner so the teardown posted there is guaranteed to catch
    /// it, even if the frame was migrating when cancellation was requested.
    cancel_requested: AtomicBool,
}

struct Core {
    /// The driven future. `None` once the frame completed or was torn down
    /// by cancellation.
    future: Option<EntryFuture>,
    runner: SerialRunner,
    run_state: RunState,
}

/// Poll/wake interlock.
///
/// `Scheduled` means a poll of this frame is sitting in the runner's queue;
/// `Notified` records a wake that arrived while a poll was in flight so the
/// poll's tail can reschedule instead of dropping the wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Scheduled,
    Polling,
    Notified,
}

/// A poll that began before the freeze is still in flight; teardown has to
/// wait for it to settle.
pub(crate) struct PollInFlight;

struct FrameWaker(Weak<Frame>);

std::thread_local! {
    static CURRENT: RefCell<Option<Arc<Frame>>> = const { RefCell::new(None) };
}

/// The frame currently being polled on this thread, if any.
pub(crate) fn current() -> Option<Arc<Frame>> {
    CURRENT.with(|cell| cell.borrow().clone())
}

struct Enter {
    prev: Option<Arc<Frame>>,
}

fn enter(frame: Arc<Frame>) -> Enter {
    let prev = CURRENT.with(|cell| cell.borrow_mut().replace(frame));
    Enter { prev }
}

impl Drop for Enter {
    fn drop(&mut self) {
        let prev = self.prev.take();
        CURRENT.with(|cell| *cell.borrow_mut() = prev);
    }
}

// === impl Frame ===

impl Frame {
    pub(crate) fn new(future: EntryFuture, runner: SerialRunner) -> Arc<Frame> {
        Arc::new_cyclic(|weak: &Weak<Frame>| Frame {
            core: Mutex::new(Core {
                future: Some(future),
                runner,
                run_state: RunState::Idle,
            }),
            waker: Waker::from(Arc::new(FrameWaker(weak.clone()))),
            cancel_requested: AtomicBool::new(false),
        })
    }

    /// Freezes the frame ahead of cancellation: wake-ups still queue no-op
    /// polls, but the future itself makes no further progress and in
    /// particular cannot migrate runners anymore.
    pub(crate) fn mark_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    /// The runner this frame is currently bound to.
    pub(crate) fn runner(&self) -> SerialRunner {
        self.core.lock().unwrap().runner.clone()
    }

    /// Rebinds the frame to `runner`.
    ///
    /// Must only be called from inside this frame's own poll (i.e. on its
    /// current strand); the caller is expected to return `Pending` and wake
    /// itself so the next poll lands on the new runner.
    pub(crate) fn set_runner(&self, runner: SerialRunner) {
        let mut core = self.core.lock().unwrap();
        debug_assert!(
            matches!(core.run_state, RunState::Polling | RunState::Notified),
            "the runner can only be rebound from inside a poll"
        );
        core.runner = runner;
    }

    /// Queues a poll of this frame onto its current runner, unless one is
    /// already queued or the wake arrived mid-poll (then the in-flight poll
    /// reschedules on its way out).
    pub(crate) fn schedule(self: &Arc<Self>) {
        let runner = {
            let mut core = self.core.lock().unwrap();
            if core.future.is_none() {
                return;
            }
            match core.run_state {
                RunState::Idle => {
                    core.run_state = RunState::Scheduled;
                    core.runner.clone()
                }
                RunState::Polling => {
                    core.run_state = RunState::Notified;
                    return;
                }
                RunState::Scheduled | RunState::Notified => return,
            }
        };

        let frame = Arc::clone(self);
        runner.post_job(Box::new(move || frame.run()));
    }

    /// Takes the driven future out of the frame without polling it.
    ///
    /// This is the cancellation path: dropping the returned future runs the
    /// drop glue of every suspended awaiter, innermost first. Callers must
    /// have frozen the frame with [`mark_cancel`][Frame::mark_cancel] first:
    /// the flag is checked under the same lock that guards the transition
    /// into `Polling`, so once this returns `Ok` no poll can ever start
    /// again and tearing the future down is race-free.
    ///
    /// # Errors
    ///
    /// Returns [`PollInFlight`] while a poll that started before the freeze
    /// is still running; the caller has to retry once it settles.
    pub(crate) fn try_take_future(&self) -> Result<Option<EntryFuture>, PollInFlight> {
        let mut core = self.core.lock().unwrap();
        match core.run_state {
            RunState::Polling | RunState::Notified => Err(PollInFlight),
            RunState::Idle | RunState::Scheduled => Ok(core.future.take()),
        }
    }

    fn run(self: &Arc<Self>) {
        let mut future = {
            let mut core = self.core.lock().unwrap();
            if self.cancel_requested.load(Ordering::Acquire) {
                // leave the future in place for the teardown to collect
                core.run_state = RunState::Idle;
                return;
            }
            let Some(future) = core.future.take() else {
                // completed or torn down after this poll was queued
                core.run_state = RunState::Idle;
                return;
            };
            core.run_state = RunState::Polling;
            future
        };

        let poll = {
            let _enter = enter(Arc::clone(self));
            let waker = self.waker.clone();
            let mut cx = Context::from_waker(&waker);
            future.as_mut().poll(&mut cx)
        };

        let repost = {
            let mut core = self.core.lock().unwrap();
            match poll {
                Poll::Ready(()) => {
                    core.run_state = RunState::Idle;
                    None
                }
                Poll::Pending => {
                    let notified = core.run_state == RunState::Notified;
                    core.future = Some(future);
                    if notified {
                        core.run_state = RunState::Scheduled;
                        Some(core.runner.clone())
                    } else {
                        core.run_state = RunState::Idle;
                        None
                    }
                }
            }
        };

        if poll.is_ready() {
            // `future` was moved back into the core above only when pending;
            // on completion it is dropped here, outside the frame lock, so
            // its drop glue can take other locks freely
            let addr = Arc::as_ptr(self);
            tracing::trace!(frame.addr = ?addr, "frame completed");
        }

        if let Some(runner) = repost {
            let frame = Arc::clone(self);
            runner.post_job(Box::new(move || frame.run()));
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").finish_non_exhaustive()
    }
}

// === impl FrameWaker ===

impl Wake for FrameWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        if let Some(frame) = self.0.upgrade() {
            frame.schedule();
        }
    }
}
