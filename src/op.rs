// Copyright 2026 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The completion-handler bridge.
//!
//! [`submit`] adapts a callback-style asynchronous operation (anything that
//! eventually invokes a completion callback, from any thread) into a
//! future. The operation is initiated when the future is first polled, i.e.
//! on the calling coroutine's strand; the completion is delivered back
//! through the frame's waker.
//!
//! Cancellation is structured: dropping the [`Operation`] before completion
//! marks it cancelled and fires the hook installed with
//! [`Handler::on_cancel`], so the hosting I/O layer can abort the in-flight
//! work. A completion that arrives after cancellation, or one that reports
//! the in-band [`Aborted`] code, is dropped silently: cancellation is never
//! surfaced as an error by the bridge itself.

use crate::loom::sync::{Arc, Mutex};
use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

/// Boxed error type carried by completions.
pub type Error = Box<dyn core::error::Error + Send + Sync + 'static>;

/// The in-band "operation aborted" code.
///
/// An operation that was cancelled from the outside completes with this
/// error; the bridge consumes it silently instead of resuming the awaiter.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Aborted;

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation aborted")
    }
}

impl core::error::Error for Aborted {}

/// Adapts a callback-style asynchronous operation into a future.
///
/// `initiate` runs on first poll and receives the [`Handler`] to hand to the
/// operation; the future resolves once [`Handler::complete`] is called.
///
/// ```
/// # use filament::{ThreadPool, block_on};
/// # use filament::op;
/// let pool = ThreadPool::new(1);
/// let out = block_on(&pool.executor(), async {
///     op::submit(|handler: op::Handler<u32>| {
///         std::thread::spawn(move || handler.complete(Ok(17)));
///     })
///     .await
/// });
/// assert_eq!(out.unwrap(), 17);
/// ```
pub fn submit<T, I>(initiate: I) -> Operation<T, I>
where
    I: FnOnce(Handler<T>),
{
    Operation {
        shared: Arc::new(Shared {
            state: Mutex::new(State {
                outcome: None,
                waker: None,
                cancelled: false,
                on_cancel: None,
            }),
        }),
        initiate: Some(initiate),
    }
}

/// Future returned by [`submit`].
#[must_use = "operations are not initiated until `.await`ed or `poll`ed"]
pub struct Operation<T, I> {
    shared: Arc<Shared<T>>,
    initiate: Option<I>,
}

/// Completion callback for one [`Operation`]; invocable from any thread.
pub struct Handler<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
}

struct State<T> {
    outcome: Option<Result<T, Error>>,
    waker: Option<Waker>,
    cancelled: bool,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

// === impl Handler ===

impl<T> Handler<T> {
    /// Delivers the operation's outcome and resumes the awaiter.
    ///
    /// The completion is dropped without resuming anything when the awaiter
    /// was cancelled in the meantime, or when `result` carries the in-band
    /// [`Aborted`] code.
    pub fn complete(self, result: Result<T, Error>) {
        let waker = {
            let mut state = self.shared.state.lock().unwrap();
            if state.cancelled {
                tracing::trace!("dropping completion for a cancelled operation");
                return;
            }
            if let Err(error) = &result {
                if error.is::<Aborted>() {
                    tracing::trace!("dropping aborted completion");
                    return;
                }
            }
            debug_assert!(state.outcome.is_none(), "operation completed twice");
            state.outcome = Some(result);
            // the operation can no longer be cancelled mid-flight
            state.on_cancel = None;
            state.waker.take()
        };

        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Installs the cancellation hook for the in-flight operation.
    ///
    /// The hook runs at most once, when the awaiter is destroyed before the
    /// completion arrives. If cancellation was already requested, `hook`
    /// runs immediately.
    pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) {
        let mut state = self.shared.state.lock().unwrap();
        if state.cancelled {
            drop(state);
            hook();
        } else {
            state.on_cancel = Some(Box::new(hook));
        }
    }
}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

// === impl Operation ===

impl<T, I> Future for Operation<T, I>
where
    I: FnOnce(Handler<T>),
{
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Safety: neither field is structurally pinned; `initiate` is moved
        // out and called, never polled in place
        let this = unsafe { self.get_unchecked_mut() };

        // register before initiating so a completion racing the first poll
        // has a waker to invoke
        {
            let mut state = this.shared.state.lock().unwrap();
            if let Some(outcome) = state.outcome.take() {
                return Poll::Ready(outcome);
            }
            state.waker = Some(cx.waker().clone());
        }

        if let Some(initiate) = this.initiate.take() {
            tracing::trace!("initiating operation");
            initiate(Handler {
                shared: Arc::clone(&this.shared),
            });

            // the initiation may have completed synchronously
            let mut state = this.shared.state.lock().unwrap();
            if let Some(outcome) = state.outcome.take() {
                return Poll::Ready(outcome);
            }
        }

        Poll::Pending
    }
}

impl<T, I> Drop for Operation<T, I> {
    fn drop(&mut self) {
        let hook = {
            let Ok(mut state) = self.shared.state.lock() else {
                return;
            };
            state.cancelled = true;
            state.waker = None;
            if state.outcome.is_none() {
                state.on_cancel.take()
            } else {
                None
            }
        };

        if let Some(hook) = hook {
            tracing::trace!("emitting cancellation for in-flight operation");
            hook();
        }
    }
}

impl<T, I> fmt::Debug for Operation<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock().unwrap();
        f.debug_struct("Operation")
            .field("initiated", &self.initiate.is_none())
            .field("completed", &state.outcome.is_some())
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ThreadPool, block_on};
    use crate::loom;
    use crate::loom::sync::atomic::{AtomicBool, Ordering};
    use crate::loom::sync::mpsc;
    use crate::test_util::{StopOnPanic, trace_init};
    use core::time::Duration;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    #[test]
    fn completion_from_another_thread_resumes() {
        let _trace = trace_init();

        loom::model(|| {
            let pool = ThreadPool::new(2);
            let out = block_on(&pool.executor(), async {
                submit(|handler: Handler<&'static str>| {
                    loom::thread::spawn(move || {
                        std::thread::sleep(Duration::from_millis(10));
                        handler.complete(Ok("delivered"));
                    });
                })
                .await
            });
            assert_eq!(out.unwrap(), "delivered");
        });
    }

    #[test]
    fn synchronous_completion_resumes_without_suspending() {
        let _trace = trace_init();

        let pool = ThreadPool::new(1);
        let out = block_on(&pool.executor(), async {
            submit(|handler: Handler<u8>| handler.complete(Ok(9))).await
        });
        assert_eq!(out.unwrap(), 9);
    }

    #[test]
    fn errors_surface_to_the_awaiter() {
        let _trace = trace_init();

        let pool = ThreadPool::new(1);
        let out = block_on(&pool.executor(), async {
            submit(|handler: Handler<()>| {
                handler.complete(Err("connection reset".into()));
            })
            .await
        });
        assert_eq!(out.unwrap_err().to_string(), "connection reset");
    }

    #[test]
    fn dropping_the_operation_fires_the_cancel_hook() {
        let _trace = trace_init();

        let cancelled = Arc::new(AtomicBool::new(false));
        let probe = Arc::clone(&cancelled);
        let (tx, rx) = mpsc::channel::<Handler<()>>();

        let mut harness = tokio_test::task::spawn(submit(move |handler: Handler<()>| {
            handler.on_cancel(move || probe.store(true, Ordering::SeqCst));
            tx.send(handler).unwrap();
        }));
        tokio_test::assert_pending!(harness.poll());
        let handler = rx.recv().unwrap();

        drop(harness);
        assert!(cancelled.load(Ordering::SeqCst), "cancel hook must fire");

        // a late completion is dropped silently
        handler.complete(Ok(()));
    }

    #[test]
    fn aborted_completions_are_dropped() {
        let _trace = trace_init();

        let mut harness = tokio_test::task::spawn(submit(|handler: Handler<()>| {
            handler.complete(Err(Aborted.into()));
        }));
        // the aborted completion must not resume the operation
        tokio_test::assert_pending!(harness.poll());
        assert!(!harness.is_woken());
    }

    #[test]
    fn hook_installed_after_cancellation_runs_immediately() {
        let _trace = trace_init();

        let (tx, rx) = mpsc::channel::<Handler<()>>();
        let mut harness = tokio_test::task::spawn(submit(move |handler: Handler<()>| {
            tx.send(handler).unwrap();
        }));
        tokio_test::assert_pending!(harness.poll());
        drop(harness);

        let ran = Arc::new(AtomicBool::new(false));
        let probe = Arc::clone(&ran);
        rx.recv()
            .unwrap()
            .on_cancel(move || probe.store(true, Ordering::SeqCst));
        assert!(ran.load(Ordering::SeqCst));
    }

    /// Echo round trip through the bridge, with blocking socket calls pushed
    /// onto helper threads acting as the hosting I/O layer.
    #[test]
    fn tcp_echo_round_trip() {
        let _trace = trace_init();

        fn read_some(mut stream: TcpStream) -> impl Future<Output = Result<Vec<u8>, Error>> {
            submit(move |handler: Handler<Vec<u8>>| {
                loom::thread::spawn(move || {
                    let mut buf = vec![0u8; 1024];
                    let result = match stream.read(&mut buf) {
                        Ok(n) => {
                            buf.truncate(n);
                            Ok(buf)
                        }
                        Err(e) => Err(e.into()),
                    };
                    handler.complete(result);
                });
            })
        }

        fn write_all(mut stream: TcpStream, data: Vec<u8>) -> impl Future<Output = Result<(), Error>> {
            submit(move |handler: Handler<()>| {
                loom::thread::spawn(move || {
                    handler.complete(stream.write_all(&data).map_err(Into::into));
                });
            })
        }

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        // the echo server: accept one connection, read up to 1024 bytes,
        // write them back
        let server = loom::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            crate::executor::run(async move {
                let data = read_some(stream.try_clone().unwrap()).await.unwrap();
                write_all(stream, data).await.unwrap();
            });
        });

        let pool = ThreadPool::new(2);
        let _guard = StopOnPanic::new(&pool);
        let echoed = block_on(&pool.executor(), async move {
            let stream = TcpStream::connect(addr).unwrap();
            write_all(stream.try_clone().unwrap(), b"abcde".to_vec())
                .await
                .unwrap();
            read_some(stream).await.unwrap()
        });

        assert_eq!(echoed, b"abcde");
        server.join().unwrap();
    }
}
