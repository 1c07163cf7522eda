// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::error::JoinError;
use core::pin::Pin;
use core::task::{Context, Poll, ready};
use pin_project::pin_project;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

/// A cold, memoizing unit of work.
///
/// `Lazy` wraps a future and does nothing until polled (which futures
/// guarantee anyway); what it adds is a terminal state that can be inspected
/// and consumed separately from driving:
///
/// - [`poll_drive`][Lazy::poll_drive] advances the inner future, capturing a
///   panic of the body into [`JoinError::Panicked`] instead of unwinding;
/// - [`take_outcome`][Lazy::take_outcome] removes the recorded outcome,
///   destroying the inner future's storage.
///
/// Awaiting a `Lazy` directly behaves like awaiting the inner future: the
/// caller drives it inline on its own strand and a captured panic resumes
/// unwinding at the await point.
#[pin_project]
pub struct Lazy<F: Future> {
    #[pin]
    stage: Stage<F>,
}

/// The lifecycle of the wrapped future: still pending, finished with a
/// recorded outcome, or finished with the outcome already taken.
#[pin_project(project = StageProj, project_replace = StageReplace)]
enum Stage<F: Future> {
    Pending(#[pin] F),
    Ready(Result<F::Output, JoinError>),
    Consumed,
}

// === impl Lazy ===

impl<F: Future> Lazy<F> {
    pub fn new(future: F) -> Self {
        Self {
            stage: Stage::Pending(future),
        }
    }

    /// `true` once the inner future has run to completion (or panicked).
    pub fn is_finished(&self) -> bool {
        !matches!(self.stage, Stage::Pending(_))
    }

    /// A view of the recorded outcome, if the future finished and the
    /// outcome has not been taken yet.
    pub fn outcome(&self) -> Option<&Result<F::Output, JoinError>> {
        match &self.stage {
            Stage::Ready(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Polls the inner future once, recording its output (or the payload of
    /// a panic escaping it) into the terminal state. Idempotent once
    /// finished.
    pub fn poll_drive(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut this = self.project();

        let outcome = match this.stage.as_mut().project() {
            StageProj::Pending(future) => {
                match catch_unwind(AssertUnwindSafe(|| future.poll(cx))) {
                    Ok(Poll::Pending) => return Poll::Pending,
                    Ok(Poll::Ready(value)) => Ok(value),
                    Err(payload) => Err(JoinError::panicked(payload)),
                }
            }
            _ => return Poll::Ready(()),
        };

        this.stage.set(Stage::Ready(outcome));
        Poll::Ready(())
    }

    /// Takes the recorded outcome, destroying the inner future's storage.
    ///
    /// # Panics
    ///
    /// Panics if the future has not finished, or if the outcome was already
    /// taken.
    #[track_caller]
    pub fn take_outcome(self: Pin<&mut Self>) -> Result<F::Output, JoinError> {
        let this = self.project();
        match this.stage.project_replace(Stage::Consumed) {
            StageReplace::Ready(outcome) => outcome,
            StageReplace::Pending(_) => panic!("lazy coroutine has not finished"),
            StageReplace::Consumed => panic!("lazy outcome already taken"),
        }
    }
}

impl<F: Future> Future for Lazy<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        ready!(self.as_mut().poll_drive(cx));
        match self.take_outcome() {
            Ok(value) => Poll::Ready(value),
            Err(err) => match err.try_into_panic() {
                Ok(payload) => resume_unwind(payload),
                Err(_) => unreachable!("a directly driven coroutine cannot be cancelled"),
            },
        }
    }
}

impl<F: Future> From<F> for Lazy<F> {
    fn from(future: F) -> Self {
        Self::new(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loom::sync::Arc;
    use crate::loom::sync::atomic::{AtomicUsize, Ordering};
    use std::pin::pin;
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready};

    #[test]
    fn lazy_is_cold() {
        let polled = Arc::new(AtomicUsize::new(0));
        let probe = Arc::clone(&polled);
        let lazy = Lazy::new(async move {
            probe.fetch_add(1, Ordering::SeqCst);
            5
        });

        assert!(!lazy.is_finished());
        assert_eq!(polled.load(Ordering::SeqCst), 0);

        let mut harness = task::spawn(lazy);
        assert_eq!(assert_ready!(harness.poll()), 5);
        assert_eq!(polled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drive_then_take() {
        let mut harness = task::spawn(());
        let mut lazy = pin!(Lazy::new(async {
            crate::task::yield_now().await;
            "out"
        }));

        harness.enter(|cx, _| {
            assert_pending!(lazy.as_mut().poll_drive(cx));
            assert!(!lazy.is_finished());
            assert_ready!(lazy.as_mut().poll_drive(cx));
        });

        assert!(lazy.is_finished());
        assert!(matches!(lazy.outcome(), Some(Ok("out"))));
        assert_eq!(lazy.as_mut().take_outcome().unwrap(), "out");
        assert!(lazy.outcome().is_none());
    }

    #[test]
    fn drive_is_idempotent_after_completion() {
        let mut harness = task::spawn(());
        let mut lazy = pin!(Lazy::new(async { 1u32 }));

        harness.enter(|cx, _| {
            assert_ready!(lazy.as_mut().poll_drive(cx));
            assert_ready!(lazy.as_mut().poll_drive(cx));
        });
        assert_eq!(lazy.take_outcome().unwrap(), 1);
    }

    #[test]
    fn panic_is_captured_on_drive() {
        let mut harness = task::spawn(());
        let mut lazy = pin!(Lazy::new(async {
            panic!("kaboom");
        }));

        harness.enter(|cx, _| assert_ready!(lazy.as_mut().poll_drive(cx)));

        let err = lazy.take_outcome().unwrap_err();
        assert!(err.is_panic());
        let payload = err.into_panic();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"kaboom"));
    }

    #[test]
    fn await_resumes_captured_panic() {
        let mut harness = task::spawn(Lazy::new(async {
            panic!("through");
        }));
        let caught = catch_unwind(AssertUnwindSafe(|| harness.poll())).unwrap_err();
        assert_eq!(caught.downcast_ref::<&str>(), Some(&"through"));
    }

    #[test]
    #[should_panic(expected = "lazy coroutine has not finished")]
    fn taking_unfinished_outcome_panics() {
        let mut lazy = pin!(Lazy::new(async {}));
        let _ = lazy.as_mut().take_outcome();
    }
}
