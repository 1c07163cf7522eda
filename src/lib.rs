// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A coroutine runtime built from a thread-pool executor and per-task
//! serialization domains ("strands").
//!
//! Futures are driven by frames, each bound to a [`SerialRunner`]: either a
//! single-threaded executor or a [`Strand`] over a multi-threaded pool. A
//! frame is only ever polled inside its runner, so a coroutine chain never
//! observes concurrent access to its own state. [`Task`]s add a shared
//! control block on top of a frame with one-shot joining and cooperative,
//! drop-based cancellation that follows a task across executor migrations.

mod any;
pub mod combine;
mod error;
pub mod executor;
mod frame;
pub mod generator;
mod lazy;
pub mod loom;
pub mod op;
pub mod runner;
pub mod strand;
pub mod task;
pub mod time;

#[cfg(test)]
mod test_util;

pub use any::AnyFuture;
pub use combine::{Either, gather, gather_all, select, select_all, try_gather, try_gather_all};
pub use error::JoinError;
pub use executor::{Executor, ThreadPool, block_on, run};
pub use generator::{Generator, Yielder};
pub use lazy::Lazy;
pub use runner::SerialRunner;
pub use strand::Strand;
pub use task::{
    AbortHandle, Task, spawn, spawn_background, spawn_background_on, spawn_on, spawn_with_runner,
    switch_to, yield_now,
};
