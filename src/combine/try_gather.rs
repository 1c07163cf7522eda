// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::combine::gather::Child;
use crate::lazy::Lazy;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::future::BoxFuture;
use std::panic::resume_unwind;

/// Waits for every fallible child, short-circuiting on the first error.
///
/// On success the result is the tuple of the children's `Ok` values. The
/// first child to fail completes the combinator immediately with its error;
/// the remaining children are cancelled when the combinator future is
/// dropped, which happens as soon as the enclosing coroutine resumes. A
/// panicking child resumes unwinding at the awaiter.
pub fn try_gather<'a, L>(list: L) -> TryGather<L::Children>
where
    L: TryGatherList<'a>,
{
    TryGather {
        children: list.into_children(),
    }
}

/// [`try_gather`] over an iterable of homogeneous fallible futures.
pub fn try_gather_all<'a, I, T, E>(futures: I) -> TryGatherAll<'a, T, E>
where
    I: IntoIterator,
    I::Item: Future<Output = Result<T, E>> + Send + 'a,
    T: Send + 'a,
    E: Send + 'a,
{
    TryGatherAll {
        children: futures
            .into_iter()
            .map(|future| Lazy::new(Box::pin(future) as BoxFuture<'a, _>))
            .collect(),
    }
}

/// Future returned by [`try_gather`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct TryGather<C> {
    children: C,
}

/// Future returned by [`try_gather_all`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct TryGatherAll<'a, T, E> {
    children: Vec<Child<'a, Result<T, E>>>,
}

/// A tuple of fallible futures sharing one error type. Implemented for
/// arities 1 through 8.
pub trait TryGatherList<'a> {
    type Children;

    fn into_children(self) -> Self::Children;
}

/// Polls one child; short-circuits out of the enclosing `poll` on a child
/// error or panic.
macro_rules! drive_child {
    ($child:expr, $cx:expr, $pending:ident) => {{
        let mut child = Pin::new($child);
        if child.as_mut().poll_drive($cx).is_ready() {
            let failed = matches!(child.outcome(), Some(Ok(Err(_)) | Err(_)));
            if failed {
                match child.take_outcome() {
                    Ok(Err(error)) => return Poll::Ready(Err(error)),
                    Err(join) => resume_unwind(join.into_panic()),
                    Ok(Ok(_)) => unreachable!(),
                }
            }
        } else {
            $pending = true;
        }
    }};
}

macro_rules! impl_try_gather {
    ($(($F:ident, $T:ident, $idx:tt)),+) => {
        impl<'a, E, $($F, $T),+> TryGatherList<'a> for ($($F,)+)
        where
            E: Send + 'a,
            $($F: Future<Output = Result<$T, E>> + Send + 'a, $T: Send + 'a,)+
        {
            type Children = ($(Child<'a, Result<$T, E>>,)+);

            fn into_children(self) -> Self::Children {
                #[allow(non_snake_case)]
                let ($($F,)+) = self;
                ($(Lazy::new(Box::pin($F) as BoxFuture<'a, _>),)+)
            }
        }

        impl<'a, E: 'a, $($T: 'a),+> Future for TryGather<($(Child<'a, Result<$T, E>>,)+)> {
            type Output = Result<($($T,)+), E>;

            fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
                let this = self.get_mut();

                let mut pending = false;
                $(
                    drive_child!(&mut this.children.$idx, cx, pending);
                )+
                if pending {
                    return Poll::Pending;
                }

                Poll::Ready(Ok(($(
                    match Pin::new(&mut this.children.$idx).take_outcome() {
                        Ok(Ok(value)) => value,
                        _ => unreachable!("failed children short-circuit above"),
                    },
                )+)))
            }
        }
    };
}

impl_try_gather!((F0, T0, 0));
impl_try_gather!((F0, T0, 0), (F1, T1, 1));
impl_try_gather!((F0, T0, 0), (F1, T1, 1), (F2, T2, 2));
impl_try_gather!((F0, T0, 0), (F1, T1, 1), (F2, T2, 2), (F3, T3, 3));
impl_try_gather!((F0, T0, 0), (F1, T1, 1), (F2, T2, 2), (F3, T3, 3), (F4, T4, 4));
impl_try_gather!(
    (F0, T0, 0),
    (F1, T1, 1),
    (F2, T2, 2),
    (F3, T3, 3),
    (F4, T4, 4),
    (F5, T5, 5)
);
impl_try_gather!(
    (F0, T0, 0),
    (F1, T1, 1),
    (F2, T2, 2),
    (F3, T3, 3),
    (F4, T4, 4),
    (F5, T5, 5),
    (F6, T6, 6)
);
impl_try_gather!(
    (F0, T0, 0),
    (F1, T1, 1),
    (F2, T2, 2),
    (F3, T3, 3),
    (F4, T4, 4),
    (F5, T5, 5),
    (F6, T6, 6),
    (F7, T7, 7)
);

// === impl TryGatherAll ===

impl<'a, T: 'a, E: 'a> Future for TryGatherAll<'a, T, E> {
    type Output = Result<Vec<T>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let mut pending = false;
        for child in &mut this.children {
            drive_child!(child, cx, pending);
        }
        if pending {
            return Poll::Pending;
        }

        Poll::Ready(Ok(this
            .children
            .iter_mut()
            .map(|child| match Pin::new(child).take_outcome() {
                Ok(Ok(value)) => value,
                _ => unreachable!("failed children short-circuit above"),
            })
            .collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ThreadPool, block_on};
    use crate::loom::sync::atomic::{AtomicBool, Ordering};
    use crate::test_util::trace_init;
    use crate::time::sleep;
    use core::time::Duration;
    use std::time::Instant;

    #[test]
    fn all_ok_yields_the_tuple() {
        let _trace = trace_init();

        let pool = ThreadPool::new(2);
        let out = block_on(&pool.executor(), async {
            crate::try_gather!(
                async { Ok::<_, &str>(1u32) },
                async {
                    sleep(Duration::from_millis(10)).await;
                    Ok::<_, &str>("two")
                },
            )
            .await
        });
        assert_eq!(out.unwrap(), (1, "two"));
    }

    #[test]
    fn first_error_cancels_the_rest() {
        let _trace = trace_init();

        static SLEEPER_DROPPED: AtomicBool = AtomicBool::new(false);
        SLEEPER_DROPPED.store(false, Ordering::SeqCst);

        struct DropFlag;
        impl Drop for DropFlag {
            fn drop(&mut self) {
                SLEEPER_DROPPED.store(true, Ordering::SeqCst);
            }
        }

        let pool = ThreadPool::new(1);
        let begin = Instant::now();
        let out = block_on(&pool.executor(), async {
            crate::try_gather!(
                async { Err::<u32, _>("immediate failure") },
                async {
                    let _flag = DropFlag;
                    sleep(Duration::from_secs(30)).await;
                    Ok("never")
                },
            )
            .await
        });

        assert_eq!(out.unwrap_err(), "immediate failure");
        assert!(
            begin.elapsed() < Duration::from_secs(5),
            "the failure must not wait for the sleeper"
        );
        assert!(
            SLEEPER_DROPPED.load(Ordering::SeqCst),
            "the losing branch must be torn down"
        );
    }

    #[test]
    fn try_gather_all_collects_in_order() {
        let _trace = trace_init();

        let pool = ThreadPool::new(2);
        let out = block_on(&pool.executor(), async {
            let children = (1..=4u32).map(|i| async move {
                sleep(Duration::from_millis(u64::from(5 - i))).await;
                Ok::<_, &str>(i * i)
            });
            try_gather_all(children).await
        });
        assert_eq!(out.unwrap(), vec![1, 4, 9, 16]);
    }

    #[test]
    fn try_gather_all_reports_an_error() {
        let _trace = trace_init();

        let pool = ThreadPool::new(1);
        let out = block_on(&pool.executor(), async {
            let children = (0..4u32).map(|i| async move {
                if i == 2 { Err(i) } else { Ok(i) }
            });
            try_gather_all(children).await
        });
        assert_eq!(out.unwrap_err(), 2);
    }
}
