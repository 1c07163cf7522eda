// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Timers.
//!
//! Every pool owns a timer: a heap of deadline entries that idle workers
//! turn, with the earliest deadline bounding how long a worker parks. A
//! [`Sleep`] registers itself on the timer of whatever executor its frame is
//! running on when first polled, and deregisters when dropped, which is how
//! a timeout losing a race gets cancelled.

mod sleep;
pub(crate) mod timer;
mod timeout;

use core::fmt;

pub use sleep::{Sleep, sleep, sleep_until};
pub use timeout::{Timeout, timeout, timeout_at};

/// Error returned by [`Timeout`] when the deadline fires first.
#[derive(Debug, Eq, PartialEq)]
pub struct Elapsed(pub(crate) ());

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("deadline has elapsed")
    }
}

impl core::error::Error for Elapsed {}
