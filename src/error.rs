// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::any::Any;
use core::fmt;

/// Error produced when joining a driven coroutine fails.
///
/// Awaiting a [`Task`][crate::Task] yields `Result<T, JoinError>`:
/// [`JoinError::Cancelled`] when the task was aborted before it could record
/// a result, [`JoinError::Panicked`] when its body panicked. The same type
/// carries per-child outcomes out of [`gather`][crate::gather].
pub enum JoinError {
    /// The task was aborted before completion.
    Cancelled,
    /// The coroutine body panicked; the payload is the panic value.
    Panicked(Box<dyn Any + Send + 'static>),
}

// === impl JoinError ===

impl JoinError {
    pub(crate) fn panicked(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self::Panicked(payload)
    }

    /// Returns `true` if the task was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if the task panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }

    /// Consumes self, returning the panic payload.
    ///
    /// # Panics
    ///
    /// Panics if this is not a [`JoinError::Panicked`].
    #[track_caller]
    pub fn into_panic(self) -> Box<dyn Any + Send + 'static> {
        match self.try_into_panic() {
            Ok(payload) => payload,
            Err(_) => panic!("JoinError is not a panic: the task was cancelled"),
        }
    }

    /// Consumes self, returning the panic payload if there is one.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged when the error is a cancellation.
    pub fn try_into_panic(self) -> Result<Box<dyn Any + Send + 'static>, JoinError> {
        match self {
            Self::Panicked(payload) => Ok(payload),
            other => Err(other),
        }
    }
}

impl fmt::Debug for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("Cancelled"),
            Self::Panicked(_) => f.write_str("Panicked(..)"),
        }
    }
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("task was cancelled"),
            Self::Panicked(_) => f.write_str("task panicked"),
        }
    }
}

impl core::error::Error for JoinError {}
