// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::error::JoinError;
use crate::lazy::Lazy;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::future::BoxFuture;

/// A heap-allocated child of a combinator: its own little frame, driven on
/// the parent's strand, with its outcome memoized until collection.
pub(super) type Child<'a, T> = Lazy<BoxFuture<'a, T>>;

/// Waits for every child and yields all their outcomes.
///
/// Each slot of the result is a `Result<T, JoinError>`: a panicking child is
/// captured into its own slot and its siblings keep running. No child is
/// ever cancelled by another's outcome.
pub fn gather<'a, L>(list: L) -> Gather<L::Children>
where
    L: GatherList<'a>,
{
    Gather {
        children: list.into_children(),
    }
}

/// [`gather`] over an iterable of homogeneous futures.
///
/// An empty iterable completes immediately with an empty vector.
pub fn gather_all<'a, I>(futures: I) -> GatherAll<'a, <I::Item as Future>::Output>
where
    I: IntoIterator,
    I::Item: Future + Send + 'a,
    <I::Item as Future>::Output: Send + 'a,
{
    GatherAll {
        children: futures
            .into_iter()
            .map(|future| Lazy::new(Box::pin(future) as BoxFuture<'a, _>))
            .collect(),
    }
}

/// Future returned by [`gather`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Gather<C> {
    children: C,
}

/// Future returned by [`gather_all`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct GatherAll<'a, T> {
    children: Vec<Child<'a, T>>,
}

/// A tuple of futures that can be gathered. Implemented for arities 1
/// through 8.
pub trait GatherList<'a> {
    type Children;

    fn into_children(self) -> Self::Children;
}

macro_rules! impl_gather {
    ($(($F:ident, $idx:tt)),+) => {
        impl<'a, $($F),+> GatherList<'a> for ($($F,)+)
        where
            $($F: Future + Send + 'a, $F::Output: Send + 'a,)+
        {
            type Children = ($(Child<'a, $F::Output>,)+);

            fn into_children(self) -> Self::Children {
                #[allow(non_snake_case)]
                let ($($F,)+) = self;
                ($(Lazy::new(Box::pin($F) as BoxFuture<'a, _>),)+)
            }
        }

        impl<'a, $($F: 'a),+> Future for Gather<($(Child<'a, $F>,)+)> {
            type Output = ($(Result<$F, JoinError>,)+);

            fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
                let this = self.get_mut();

                let mut pending = false;
                $(
                    if Pin::new(&mut this.children.$idx).poll_drive(cx).is_pending() {
                        pending = true;
                    }
                )+
                if pending {
                    return Poll::Pending;
                }

                Poll::Ready(($(Pin::new(&mut this.children.$idx).take_outcome(),)+))
            }
        }
    };
}

impl_gather!((F0, 0));
impl_gather!((F0, 0), (F1, 1));
impl_gather!((F0, 0), (F1, 1), (F2, 2));
impl_gather!((F0, 0), (F1, 1), (F2, 2), (F3, 3));
impl_gather!((F0, 0), (F1, 1), (F2, 2), (F3, 3), (F4, 4));
impl_gather!((F0, 0), (F1, 1), (F2, 2), (F3, 3), (F4, 4), (F5, 5));
impl_gather!((F0, 0), (F1, 1), (F2, 2), (F3, 3), (F4, 4), (F5, 5), (F6, 6));
impl_gather!(
    (F0, 0),
    (F1, 1),
    (F2, 2),
    (F3, 3),
    (F4, 4),
    (F5, 5),
    (F6, 6),
    (F7, 7)
);

// === impl GatherAll ===

impl<'a, T: 'a> Future for GatherAll<'a, T> {
    type Output = Vec<Result<T, JoinError>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let mut pending = false;
        for child in &mut this.children {
            if Pin::new(child).poll_drive(cx).is_pending() {
                pending = true;
            }
        }
        if pending {
            return Poll::Pending;
        }

        Poll::Ready(
            this.children
                .iter_mut()
                .map(|child| Pin::new(child).take_outcome())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ThreadPool, block_on};
    use crate::test_util::trace_init;
    use crate::time::sleep;
    use core::time::Duration;
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready};

    #[test]
    fn gathers_heterogeneous_outcomes() {
        let _trace = trace_init();

        let pool = ThreadPool::new(2);
        let (a, b, c) = block_on(&pool.executor(), async {
            crate::gather!(
                async { 1u32 },
                async {
                    sleep(Duration::from_millis(10)).await;
                    "two"
                },
                async { 3.0f64 },
            )
            .await
        });
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), "two");
        assert_eq!(c.unwrap(), 3.0);
    }

    #[test]
    fn single_child_gather_is_a_one_tuple() {
        let _trace = trace_init();

        let pool = ThreadPool::new(1);
        let (only,) =
            block_on(&pool.executor(), async { crate::gather!(async { 11u8 }).await });
        assert_eq!(only.unwrap(), 11);
    }

    #[test]
    fn sibling_outcomes_survive_a_panicking_child() {
        let _trace = trace_init();

        let pool = ThreadPool::new(1);
        let (ok, panicked) = block_on(&pool.executor(), async {
            crate::gather!(
                async {
                    sleep(Duration::from_millis(20)).await;
                    "fine"
                },
                async {
                    panic!("one child down");
                },
            )
            .await
        });
        assert_eq!(ok.unwrap(), "fine", "sibling must not be disturbed");
        let err = panicked.unwrap_err();
        assert!(err.is_panic());
    }

    #[test]
    fn gather_all_preserves_order() {
        let _trace = trace_init();

        let pool = ThreadPool::new(2);
        let out = block_on(&pool.executor(), async {
            // completion order is reversed; result order must not be
            let children = (0..5u64).rev().map(|i| async move {
                sleep(Duration::from_millis(5 * i)).await;
                i
            });
            gather_all(children).await
        });
        let values: Vec<u64> = out.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn empty_gather_all_completes_immediately() {
        let mut harness = task::spawn(gather_all(Vec::<std::future::Ready<u8>>::new()));
        let out = assert_ready!(harness.poll());
        assert!(out.is_empty());
    }

    #[test]
    fn children_progress_independently() {
        // poll-level check: one pending child must not stop a finished
        // sibling from recording its outcome
        let mut harness = task::spawn(gather((
            std::future::ready(1u8),
            futures::future::pending::<u8>(),
        )));
        assert_pending!(harness.poll());
        drop(harness);
    }
}
