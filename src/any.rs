// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::future::BoxFuture;

/// An owning, type-erased future.
///
/// Erases futures with different concrete types (and different output
/// types) behind one awaitable yielding `R`: any future whose output
/// converts `Into<R>` fits. For a closed set of alternatives, make `R` an
/// enum with `From` impls for each leg; a `()`-returning leg is covered by
/// `R: From<()>` reifying the unit case.
///
/// ```
/// # use filament::{AnyFuture, ThreadPool, block_on};
/// #[derive(Debug, PartialEq)]
/// enum Outcome {
///     Number(u32),
///     Nothing,
/// }
/// impl From<u32> for Outcome {
///     fn from(n: u32) -> Self {
///         Outcome::Number(n)
///     }
/// }
/// impl From<()> for Outcome {
///     fn from((): ()) -> Self {
///         Outcome::Nothing
///     }
/// }
///
/// let pool = ThreadPool::new(1);
/// let out = block_on(&pool.executor(), async {
///     let legs = vec![
///         AnyFuture::new(async { 7u32 }),
///         AnyFuture::new(async {}),
///     ];
///     let mut got = Vec::new();
///     for leg in legs {
///         got.push(leg.await);
///     }
///     got
/// });
/// assert_eq!(out, vec![Outcome::Number(7), Outcome::Nothing]);
/// ```
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct AnyFuture<'a, R> {
    inner: BoxFuture<'a, R>,
}

// === impl AnyFuture ===

impl<'a, R> AnyFuture<'a, R> {
    /// Erases `future`, converting its output into `R` on completion.
    pub fn new<F>(future: F) -> Self
    where
        F: Future + Send + 'a,
        F::Output: Into<R>,
        R: 'a,
    {
        Self {
            inner: Box::pin(async move { future.await.into() }),
        }
    }
}

impl<R> Future for AnyFuture<'_, R> {
    type Output = R;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().inner.as_mut().poll(cx)
    }
}

impl<R> fmt::Debug for AnyFuture<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyFuture").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ThreadPool, block_on};
    use crate::test_util::trace_init;
    use crate::time::sleep;
    use core::time::Duration;

    #[derive(Debug, PartialEq)]
    enum Leg {
        Text(&'static str),
        Number(u64),
        Unit,
    }

    impl From<&'static str> for Leg {
        fn from(s: &'static str) -> Self {
            Leg::Text(s)
        }
    }
    impl From<u64> for Leg {
        fn from(n: u64) -> Self {
            Leg::Number(n)
        }
    }
    impl From<()> for Leg {
        fn from((): ()) -> Self {
            Leg::Unit
        }
    }

    #[test]
    fn erases_a_closed_set_of_futures() {
        let _trace = trace_init();

        let pool = ThreadPool::new(1);
        let out = block_on(&pool.executor(), async {
            let legs = vec![
                AnyFuture::<Leg>::new(async {
                    sleep(Duration::from_millis(5)).await;
                    "text"
                }),
                AnyFuture::<Leg>::new(async { 12u64 }),
                AnyFuture::<Leg>::new(sleep(Duration::from_millis(1))),
            ];
            let mut got = Vec::new();
            for leg in legs {
                got.push(leg.await);
            }
            got
        });
        assert_eq!(out, vec![Leg::Text("text"), Leg::Number(12), Leg::Unit]);
    }

    #[test]
    fn identity_erasure_needs_no_conversion() {
        let _trace = trace_init();

        let pool = ThreadPool::new(1);
        let out = block_on(&pool.executor(), async {
            AnyFuture::<u32>::new(async { 99u32 }).await
        });
        assert_eq!(out, 99);
    }
}
