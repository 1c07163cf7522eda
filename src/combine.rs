// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Composition combinators.
//!
//! All three families drive their children inline, inside the parent's own
//! poll: every child runs on the parent's strand, and dropping the
//! combinator future drops all unfinished children, which is how
//! cancellation cascades:
//!
//! - [`gather`] waits for **all** children and preserves each child's
//!   outcome independently; a sibling panicking does not disturb the rest;
//! - [`try_gather`] waits for all children of fallible futures but
//!   completes, and cancels the rest, on the **first error**;
//! - [`select`] completes with the **first** child to finish and cancels
//!   the rest.
//!
//! Tuple forms take heterogeneous children (arities 1 through 8, or the
//! [`gather!`]/[`try_gather!`]/[`select!`] macros); the `*_all` forms take
//! an iterable of homogeneous children.
//!
//! [`gather!`]: crate::gather!
//! [`try_gather!`]: crate::try_gather!
//! [`select!`]: crate::select!

mod gather;
mod select;
mod try_gather;

pub use futures::future::Either;
pub use gather::{Gather, GatherAll, GatherList, gather, gather_all};
pub use select::{Select, SelectAll, select, select_all};
pub use try_gather::{TryGather, TryGatherAll, TryGatherList, try_gather, try_gather_all};

/// [`combine::gather`][gather] over a heterogeneous list of futures.
///
/// `gather!(a, b, c)` waits for all three and yields
/// `(Result<A, JoinError>, Result<B, JoinError>, Result<C, JoinError>)`.
#[macro_export]
macro_rules! gather {
    ($($future:expr),+ $(,)?) => {
        $crate::combine::gather(($($future,)+))
    };
}

/// [`combine::try_gather`][try_gather] over a heterogeneous list of fallible
/// futures.
///
/// `try_gather!(a, b, c)` yields `Result<(A, B, C), E>`, completing with the
/// first error and cancelling the rest.
#[macro_export]
macro_rules! try_gather {
    ($($future:expr),+ $(,)?) => {
        $crate::combine::try_gather(($($future,)+))
    };
}

/// [`combine::select`][select] over two or more futures, right-folded.
///
/// `select!(a, b, c)` is `select(a, select(b, c))`: the winner is identified
/// structurally as `Either<A, Either<B, C>>`.
#[macro_export]
macro_rules! select {
    ($a:expr, $b:expr $(,)?) => {
        $crate::combine::select($a, $b)
    };
    ($a:expr, $($rest:expr),+ $(,)?) => {
        $crate::combine::select($a, $crate::select!($($rest),+))
    };
}
