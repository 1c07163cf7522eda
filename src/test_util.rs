// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::executor::ThreadPool;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a per-test subscriber honouring `RUST_LOG`.
pub(crate) fn trace_init() -> DefaultGuard {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_thread_names(true)
        .set_default()
}

/// Force-stops the pool if the test body unwinds.
///
/// On the success path the pool's own `Drop` does an orderly stop-and-join;
/// this guard only matters when an assertion fails while background tasks
/// are still in flight, where the force-stop keeps the teardown from waiting
/// on work that will never arrive.
#[must_use]
pub(crate) struct StopOnPanic<'p> {
    pool: &'p ThreadPool,
}

impl<'p> StopOnPanic<'p> {
    pub(crate) fn new(pool: &'p ThreadPool) -> Self {
        Self { pool }
    }
}

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.pool.stop();
        }
    }
}
