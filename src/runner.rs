// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::executor::{Executor, Job};
use crate::strand::Strand;
use core::fmt;

/// The serialization domain a coroutine chain runs on.
///
/// Either a bare executor that is already serial (a single-threaded pool) or
/// a [`Strand`] over a multi-threaded pool. Every frame is only ever resumed
/// through its runner, which is what lets coroutine-local state go unlocked.
#[derive(Clone)]
pub struct SerialRunner {
    kind: Kind,
}

#[derive(Clone)]
enum Kind {
    Direct(Executor),
    Strand(Strand),
}

// === impl SerialRunner ===

impl SerialRunner {
    /// Wraps `executor`: stored as-is when it is already serial, otherwise
    /// behind a fresh strand.
    pub fn new(executor: Executor) -> Self {
        let kind = if executor.is_serial() {
            Kind::Direct(executor)
        } else {
            Kind::Strand(Strand::new(executor))
        };
        Self { kind }
    }

    /// Uses `strand` as the serialization domain directly.
    pub fn from_strand(strand: Strand) -> Self {
        Self {
            kind: Kind::Strand(strand),
        }
    }

    /// Posts `f` into the serialization domain.
    pub fn post(&self, f: impl FnOnce() + Send + 'static) {
        self.post_job(Box::new(f));
    }

    pub(crate) fn post_job(&self, job: Job) {
        match &self.kind {
            Kind::Direct(executor) => executor.post_job(job),
            Kind::Strand(strand) => strand.post_job(job),
        }
    }

    /// The underlying (possibly parallel) executor.
    pub fn inner(&self) -> &Executor {
        match &self.kind {
            Kind::Direct(executor) => executor,
            Kind::Strand(strand) => strand.executor(),
        }
    }

    /// A sibling runner over the same pool: a distinct strand when the pool
    /// is parallel, an equivalent runner when it is already serial.
    ///
    /// This is how a parent launches a child that shares CPU resources but
    /// serializes independently.
    pub fn fork(&self) -> SerialRunner {
        match &self.kind {
            Kind::Direct(executor) => Self {
                kind: Kind::Direct(executor.clone()),
            },
            Kind::Strand(strand) => Self {
                kind: Kind::Strand(Strand::new(strand.executor().clone())),
            },
        }
    }

    /// `true` iff `self` and `other` are the same serialization domain, i.e.
    /// callables posted to either can never run concurrently.
    pub fn same_serialization(&self, other: &SerialRunner) -> bool {
        match (&self.kind, &other.kind) {
            (Kind::Direct(a), Kind::Direct(b)) => a == b,
            (Kind::Strand(a), Kind::Strand(b)) => a.same(b),
            _ => false,
        }
    }
}

impl fmt::Debug for SerialRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Direct(executor) => f.debug_tuple("SerialRunner").field(executor).finish(),
            Kind::Strand(strand) => f.debug_tuple("SerialRunner").field(strand).finish(),
        }
    }
}
