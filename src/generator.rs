// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Cold pull-sequences.
//!
//! A [`Generator`] wraps a coroutine body that produces values through a
//! [`Yielder`]; nothing runs until the consumer asks for the next value.
//! Each [`Generator::next`] call drives the body to its next
//! [`Yielder::emit`] (or to completion), handing exactly one value across a
//! single slot. Generators are not restartable, and also implement
//! [`Stream`] so the `futures` adapters apply.
//!
//! ```
//! # use filament::{ThreadPool, block_on};
//! # use filament::generator::Generator;
//! let pool = ThreadPool::new(1);
//! let sum = block_on(&pool.executor(), async {
//!     let mut g = Generator::new(|y| async move {
//!         for i in 1..=3u32 {
//!             y.emit(i).await;
//!         }
//!     });
//!     let mut sum = 0;
//!     while let Some(i) = g.next().await {
//!         sum += i;
//!     }
//!     sum
//! });
//! assert_eq!(sum, 6);
//! ```

use crate::loom::sync::{Arc, Mutex};
use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use futures::future::BoxFuture;

/// A cold coroutine yielding a lazy pull-sequence of `T`.
pub struct Generator<T> {
    /// The body. `None` once run to completion: end-of-stream.
    future: Option<BoxFuture<'static, ()>>,
    slot: Arc<Slot<T>>,
}

/// The producing half handed to a generator body.
pub struct Yielder<T> {
    slot: Arc<Slot<T>>,
}

struct Slot<T> {
    value: Mutex<Option<T>>,
}

// === impl Generator ===

impl<T: Send + 'static> Generator<T> {
    /// Builds a generator from a coroutine body. The body does not run until
    /// the first [`next`][Generator::next] call.
    pub fn new<B, F>(body: B) -> Self
    where
        B: FnOnce(Yielder<T>) -> F,
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = Arc::new(Slot {
            value: Mutex::new(None),
        });
        let yielder = Yielder {
            slot: Arc::clone(&slot),
        };
        Self {
            future: Some(Box::pin(body(yielder))),
            slot,
        }
    }

    /// Drives the body to its next yielded value, or to completion.
    ///
    /// Returns `None` at end-of-stream, and keeps returning `None` on
    /// subsequent calls.
    pub fn next(&mut self) -> Next<'_, T> {
        Next { generator: self }
    }

    fn poll_next_inner(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let Some(future) = self.future.as_mut() else {
            return Poll::Ready(None);
        };

        match future.as_mut().poll(cx) {
            Poll::Ready(()) => {
                // the body may have emitted one last value right before
                // returning
                self.future = None;
                Poll::Ready(self.slot.take())
            }
            Poll::Pending => match self.slot.take() {
                Some(value) => Poll::Ready(Some(value)),
                // a genuine suspension inside the body; its waker is
                // registered through `cx`
                None => Poll::Pending,
            },
        }
    }
}

impl<T: Send + 'static> Stream for Generator<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().poll_next_inner(cx)
    }
}

impl<T> Unpin for Generator<T> {}

impl<T> fmt::Debug for Generator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("finished", &self.future.is_none())
            .finish_non_exhaustive()
    }
}

/// Future returned by [`Generator::next`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Next<'g, T> {
    generator: &'g mut Generator<T>,
}

impl<T: Send + 'static> Future for Next<'_, T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.generator.poll_next_inner(cx)
    }
}

// === impl Yielder ===

impl<T: Send + 'static> Yielder<T> {
    /// Hands `value` to the consumer and suspends the body until it has been
    /// taken.
    pub fn emit(&self, value: T) -> Emit<'_, T> {
        Emit {
            slot: &self.slot,
            value: Some(value),
        }
    }
}

impl<T> fmt::Debug for Yielder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Yielder").finish_non_exhaustive()
    }
}

/// Future returned by [`Yielder::emit`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Emit<'y, T> {
    slot: &'y Slot<T>,
    value: Option<T>,
}

impl<T> Future for Emit<'_, T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Safety: no field is structurally pinned
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(value) = this.value.take() {
            this.slot.put(value);
            // the consumer drives this future directly; once it has taken
            // the value it will poll again, no waker needed
            return Poll::Pending;
        }

        if this.slot.is_empty() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

// === impl Slot ===

impl<T> Slot<T> {
    fn put(&self, value: T) {
        let mut slot = self.value.lock().unwrap();
        debug_assert!(slot.is_none(), "yielded over an unconsumed value");
        *slot = Some(value);
    }

    fn take(&self) -> Option<T> {
        self.value.lock().unwrap().take()
    }

    fn is_empty(&self) -> bool {
        self.value.lock().unwrap().is_none()
    }
}
