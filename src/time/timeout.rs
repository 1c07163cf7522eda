// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::time::Elapsed;
use crate::time::sleep::{Sleep, sleep, sleep_until};
use core::pin::Pin;
use core::task::{Context, Poll};
use core::time::Duration;
use pin_project::pin_project;
use std::time::Instant;

/// Bounds how long `work` may take: the packaged form of racing it against a
/// sleep.
///
/// When the deadline fires first, the work is dropped (cancelling whatever
/// it was suspended on) and `Err(Elapsed)` is returned.
pub fn timeout<F>(duration: Duration, work: F) -> Timeout<F::IntoFuture>
where
    F: IntoFuture,
{
    Timeout {
        delay: sleep(duration),
        work: work.into_future(),
    }
}

/// [`timeout`] against an absolute deadline instead of a duration.
pub fn timeout_at<F>(deadline: Instant, work: F) -> Timeout<F::IntoFuture>
where
    F: IntoFuture,
{
    Timeout {
        delay: sleep_until(deadline),
        work: work.into_future(),
    }
}

/// Future returned by [`timeout`] and [`timeout_at`].
#[pin_project]
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Timeout<F> {
    #[pin]
    delay: Sleep,
    #[pin]
    work: F,
}

impl<F> Timeout<F> {
    /// The instant at which the bounded work is abandoned.
    pub fn deadline(&self) -> Instant {
        self.delay.deadline()
    }

    /// Unwraps the bounded work, discarding the deadline.
    pub fn into_inner(self) -> F {
        self.work
    }
}

impl<F: Future> Future for Timeout<F> {
    type Output = Result<F::Output, Elapsed>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        // the work gets the first look, so a result that lands on the same
        // tick as the deadline still counts
        match this.work.poll(cx) {
            Poll::Ready(value) => Poll::Ready(Ok(value)),
            Poll::Pending => this.delay.poll(cx).map(|()| Err(Elapsed(()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ThreadPool, block_on};
    use crate::test_util::trace_init;
    use crate::time::sleep;

    #[test]
    fn completes_before_the_deadline() {
        let _trace = trace_init();

        let pool = ThreadPool::new(1);
        let out = block_on(&pool.executor(), async {
            timeout(Duration::from_secs(5), async {
                sleep(Duration::from_millis(10)).await;
                "made it"
            })
            .await
        });
        assert_eq!(out, Ok("made it"));
    }

    #[test]
    fn elapses_when_the_work_is_too_slow() {
        let _trace = trace_init();

        let pool = ThreadPool::new(1);
        let out = block_on(&pool.executor(), async {
            timeout(Duration::from_millis(30), async {
                sleep(Duration::from_secs(10)).await;
                "too late"
            })
            .await
        });
        assert_eq!(out, Err(Elapsed(())));
    }

    #[test]
    fn deadline_is_exposed() {
        let before = Instant::now();
        let bounded = timeout(Duration::from_secs(2), async {});
        assert!(bounded.deadline() >= before + Duration::from_secs(2));
    }
}
