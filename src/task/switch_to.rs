// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::executor::Executor;
use crate::frame;
use crate::runner::SerialRunner;
use core::pin::Pin;
use core::task::{Context, Poll};

/// Migrates the calling coroutine chain onto `executor`.
///
/// A no-op when the chain already runs on `executor`. Otherwise the frame is
/// rebound to a fresh [`SerialRunner`] over the target and resumes there;
/// everything awaited afterwards, including the rest of the caller chain,
/// runs on the new executor. The rebind is observable by a concurrent abort,
/// which follows the frame to the new runner.
pub fn switch_to(executor: &Executor) -> SwitchTo {
    SwitchTo {
        target: executor.clone(),
    }
}

/// Future returned by [`switch_to`].
#[derive(Debug)]
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct SwitchTo {
    target: Executor,
}

impl Future for SwitchTo {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let frame = frame::current().expect("switch_to must be polled from within a runtime");

        if frame.runner().inner() == &self.target {
            return Poll::Ready(());
        }

        tracing::trace!(target = ?self.target, "migrating to new executor");
        frame.set_runner(SerialRunner::new(self.target.clone()));
        // the wake lands on the new runner; this poll's tail reschedules us
        // there rather than on the strand we are leaving
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
