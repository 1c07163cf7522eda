// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::pin::Pin;
use core::task::{Context, Poll};
use futures::future::{BoxFuture, Either};

/// Waits for the first of two futures to complete, success or panic, and
/// cancels the other.
///
/// The winner is identified structurally: `Either::Left` for `a`,
/// `Either::Right` for `b`. The loser is dropped with the combinator, which
/// is what cancels whatever it was suspended on; a timeout is just
/// `select(sleep(d), work)`. Wider closed sets right-fold via
/// [`select!`][crate::select!].
pub fn select<'a, F1, F2>(a: F1, b: F2) -> Select<'a, F1::Output, F2::Output>
where
    F1: Future + Send + 'a,
    F2: Future + Send + 'a,
    F1::Output: 'a,
    F2::Output: 'a,
{
    Select {
        a: Box::pin(a),
        b: Box::pin(b),
    }
}

/// Waits for the first of an iterable of homogeneous futures, yielding the
/// winner's index and output. The rest are cancelled by drop.
///
/// # Panics
///
/// Panics if `futures` is empty; an empty selection could never complete.
#[track_caller]
pub fn select_all<'a, I>(futures: I) -> SelectAll<'a, <I::Item as Future>::Output>
where
    I: IntoIterator,
    I::Item: Future + Send + 'a,
    <I::Item as Future>::Output: 'a,
{
    let children: Vec<BoxFuture<'a, _>> = futures
        .into_iter()
        .map(|future| Box::pin(future) as BoxFuture<'a, _>)
        .collect();
    assert!(!children.is_empty(), "cannot select over no futures");
    SelectAll { children }
}

/// Future returned by [`select`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Select<'a, A, B> {
    a: BoxFuture<'a, A>,
    b: BoxFuture<'a, B>,
}

/// Future returned by [`select_all`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct SelectAll<'a, T> {
    children: Vec<BoxFuture<'a, T>>,
}

// === impl Select ===

impl<A, B> Future for Select<'_, A, B> {
    type Output = Either<A, B>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Poll::Ready(value) = this.a.as_mut().poll(cx) {
            return Poll::Ready(Either::Left(value));
        }
        if let Poll::Ready(value) = this.b.as_mut().poll(cx) {
            return Poll::Ready(Either::Right(value));
        }
        Poll::Pending
    }
}

// === impl SelectAll ===

impl<T> Future for SelectAll<'_, T> {
    type Output = (usize, T);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        for (index, child) in this.children.iter_mut().enumerate() {
            if let Poll::Ready(value) = child.as_mut().poll(cx) {
                return Poll::Ready((index, value));
            }
        }
        Poll::Pending
    }
}
