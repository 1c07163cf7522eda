// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::executor::Executor;
use crate::loom::sync::Arc;
use crate::time::timer::TimerEntry;
use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};
use core::time::Duration;
use std::time::Instant;

/// Waits until `duration` has elapsed.
///
/// The deadline is taken from the steady clock at construction time; the
/// timer it arms is the one of whatever executor the future is first polled
/// on.
pub fn sleep(duration: Duration) -> Sleep {
    sleep_until(Instant::now() + duration)
}

/// Waits until `deadline` has been reached.
pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep {
        deadline,
        entry: None,
    }
}

/// Future returned by [`sleep`] and [`sleep_until`].
///
/// Dropping the future before it fires cancels the timer entry: the heap
/// slot goes dead with the entry and is pruned lazily.
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Sleep {
    deadline: Instant,
    entry: Option<Arc<TimerEntry>>,
}

impl Sleep {
    /// The instant this sleep fires at.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if Instant::now() >= self.deadline {
            return Poll::Ready(());
        }

        if let Some(entry) = &self.entry {
            entry.set_waker(cx.waker());
            return Poll::Pending;
        }

        let executor =
            Executor::try_current().expect("sleep must be polled from within a runtime");
        let entry = Arc::new(TimerEntry::new(self.deadline));
        entry.set_waker(cx.waker());
        executor.register_timer(&entry);
        tracing::trace!(deadline = ?self.deadline, "sleep registered");
        self.entry = Some(entry);

        Poll::Pending
    }
}

impl fmt::Debug for Sleep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sleep")
            .field("deadline", &self.deadline)
            .field("registered", &self.entry.is_some())
            .finish()
    }
}
