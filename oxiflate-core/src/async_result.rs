//! Begin/End completion tokens on top of a Tokio runtime.
//!
//! [`AsyncResult::begin`] adapts any `Future` into a Begin/End style
//! operation: the future is polled once on the calling thread (the
//! synchronous fast path) and, if it is not ready yet, spawned on the given
//! runtime, optionally racing a one-shot timer. [`AsyncResult::end`] blocks
//! until the operation has an outcome and hands it out exactly once.
//!
//! # Example
//!
//! ```rust
//! use oxiflate_core::async_result::{AsyncResult, OperationTag};
//!
//! const LOOKUP: OperationTag = OperationTag::new("lookup");
//!
//! let runtime = tokio::runtime::Builder::new_multi_thread()
//!     .enable_all()
//!     .build()
//!     .unwrap();
//!
//! let token = AsyncResult::begin(runtime.handle(), None, None, async { Ok(42) }, LOOKUP, None);
//! assert!(token.completed_synchronously());
//! assert_eq!(token.end(LOOKUP).unwrap(), 42);
//! assert!(token.end(LOOKUP).is_err());
//! ```
//!
//! `end` blocks the calling thread; do not call it from a task running on a
//! current-thread runtime that also drives the operation.

use crate::error::{OxiFlateError, Result};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, trace};

/// Caller-supplied state carried by a token.
pub type AsyncState = Arc<dyn Any + Send + Sync>;

/// Completion callback, invoked exactly once with the completed token.
pub type AsyncCallback<T> = Box<dyn FnOnce(&AsyncResult<T>) + Send + 'static>;

type BoxedOperation<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

/// Identifies the operation family a token belongs to.
///
/// `end` rejects a token whose tag differs from the expected one, so a token
/// produced by one Begin method cannot be consumed by another family's End.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationTag(&'static str);

impl OperationTag {
    /// Create a tag.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Tag name.
    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// One-shot atomic guard: the first `try_enter` wins, every later call fails.
#[derive(Debug, Default)]
pub struct SingleEntryGate {
    entered: AtomicBool,
}

impl SingleEntryGate {
    /// Create an open gate.
    pub const fn new() -> Self {
        Self {
            entered: AtomicBool::new(false),
        }
    }

    /// Try to pass the gate. Returns true for exactly one caller.
    pub fn try_enter(&self) -> bool {
        self.entered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether someone already passed the gate.
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

enum Outcome<T> {
    Pending,
    Ready(Result<T>),
    TimedOut,
    Consumed,
}

struct Shared<T> {
    tag: OperationTag,
    state: Option<AsyncState>,
    timeout: Option<Duration>,
    /// Held while `begin` polls, spawns and arms the timer.
    setup: Mutex<()>,
    timer: Mutex<Option<JoinHandle<()>>>,
    /// The spawned operation, if the first poll did not complete it.
    task: Mutex<Option<AbortHandle>>,
    callback: Mutex<Option<AsyncCallback<T>>>,
    /// Completion and timer race through this gate.
    completion_gate: SingleEntryGate,
    end_gate: SingleEntryGate,
    completed_synchronously: AtomicBool,
    outcome: Mutex<Outcome<T>>,
    ready: Condvar,
}

/// Completion token of one asynchronous operation.
///
/// Cloning yields another handle to the same operation; the callback
/// receives such a handle.
pub struct AsyncResult<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for AsyncResult<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for AsyncResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult")
            .field("tag", &self.shared.tag)
            .field("timeout", &self.shared.timeout)
            .field("completed", &self.is_completed())
            .field(
                "completed_synchronously",
                &self.shared.completed_synchronously.load(Ordering::Acquire),
            )
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Send + 'static> AsyncResult<T> {
    /// Start `operation` and return its token.
    ///
    /// The operation is polled once inside `handle`'s runtime context. If it
    /// is ready, the token completes synchronously and `callback` runs on the
    /// calling thread before `begin` returns. Otherwise the operation is
    /// spawned on `handle` and, when `timeout` is set, a timer is armed; the
    /// callback then runs on a runtime thread.
    pub fn begin<F>(
        handle: &Handle,
        callback: Option<AsyncCallback<T>>,
        state: Option<AsyncState>,
        operation: F,
        tag: OperationTag,
        timeout: Option<Duration>,
    ) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let token = Self {
            shared: Arc::new(Shared {
                tag,
                state,
                timeout,
                setup: Mutex::new(()),
                timer: Mutex::new(None),
                task: Mutex::new(None),
                callback: Mutex::new(callback),
                completion_gate: SingleEntryGate::new(),
                end_gate: SingleEntryGate::new(),
                completed_synchronously: AtomicBool::new(false),
                outcome: Mutex::new(Outcome::Pending),
                ready: Condvar::new(),
            }),
        };

        let mut operation: BoxedOperation<T> = Box::pin(operation);
        let immediate = {
            let _setup = lock(&token.shared.setup);
            let _runtime = handle.enter();
            let mut cx = Context::from_waker(Waker::noop());

            match operation.as_mut().poll(&mut cx) {
                Poll::Ready(outcome) => Some(outcome),
                Poll::Pending => {
                    let completion = token.clone();
                    let task = handle.spawn(async move {
                        let outcome = operation.await;
                        completion.complete(outcome, false);
                    });
                    *lock(&token.shared.task) = Some(task.abort_handle());

                    if let Some(after) = timeout {
                        let expiry = token.clone();
                        let timer = handle.spawn(async move {
                            tokio::time::sleep(after).await;
                            expiry.expire(after);
                        });
                        *lock(&token.shared.timer) = Some(timer);
                    }
                    None
                }
            }
        };

        match immediate {
            Some(outcome) => {
                trace!(tag = tag.name(), "operation completed synchronously");
                token.complete(outcome, true);
            }
            None => trace!(tag = tag.name(), ?timeout, "operation pending"),
        }
        token
    }

    fn complete(&self, outcome: Result<T>, synchronously: bool) {
        // Wait until begin has finished its setup (including the timer).
        drop(lock(&self.shared.setup));

        if !self.shared.completion_gate.try_enter() {
            debug!(
                tag = self.shared.tag.name(),
                "operation completed after its timeout, result discarded"
            );
            return;
        }
        self.shared
            .completed_synchronously
            .store(synchronously, Ordering::Release);
        self.publish(Outcome::Ready(outcome));
    }

    fn expire(&self, after: Duration) {
        drop(lock(&self.shared.setup));

        if !self.shared.completion_gate.try_enter() {
            return;
        }
        debug!(tag = self.shared.tag.name(), ?after, "operation timed out");
        self.publish(Outcome::TimedOut);
    }

    fn publish(&self, outcome: Outcome<T>) {
        *lock(&self.shared.outcome) = outcome;
        self.shared.ready.notify_all();

        let callback = lock(&self.shared.callback).take();
        if let Some(callback) = callback {
            callback(self);
        }
    }
}

impl<T> AsyncResult<T> {
    /// Consume the outcome of the operation.
    ///
    /// Fails with `InvalidArgument` when `tag` does not match the tag given to
    /// `begin`, with `InvalidOperation` when the token was already ended and
    /// with `Timeout` when the timer won the race. Otherwise blocks until the
    /// operation has completed and returns its result or its original error.
    pub fn end(&self, tag: OperationTag) -> Result<T> {
        self.end_with(tag, || {})
    }

    /// Like [`end`](Self::end), running `on_consumed` once the token has
    /// passed the tag and single-consumption checks and its outcome was
    /// collected.
    pub fn end_with<F: FnOnce()>(&self, tag: OperationTag, on_consumed: F) -> Result<T> {
        if self.shared.tag != tag {
            return Err(OxiFlateError::invalid_argument(format!(
                "completion token belongs to '{}', not '{}'",
                self.shared.tag.name(),
                tag.name()
            )));
        }
        if !self.shared.end_gate.try_enter() {
            return Err(OxiFlateError::invalid_operation(format!(
                "End was already called for this '{}' operation",
                tag.name()
            )));
        }

        let outcome = {
            let mut slot = lock(&self.shared.outcome);
            while matches!(*slot, Outcome::Pending) {
                slot = self
                    .shared
                    .ready
                    .wait(slot)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            std::mem::replace(&mut *slot, Outcome::Consumed)
        };

        drop(lock(&self.shared.setup));
        if let Some(timer) = lock(&self.shared.timer).take() {
            timer.abort();
        }
        on_consumed();

        match outcome {
            Outcome::Ready(result) => result,
            Outcome::TimedOut => Err(OxiFlateError::timeout(
                self.shared.timeout.unwrap_or_default(),
            )),
            Outcome::Pending | Outcome::Consumed => Err(OxiFlateError::invalid_operation(
                "completion token holds no outcome",
            )),
        }
    }

    /// Stop the spawned operation at its next suspension point.
    ///
    /// Does nothing once the operation has finished. A token that has no
    /// outcome yet never gets one, so `end` would block; abort only work
    /// whose token timed out or was already ended.
    pub fn abort(&self) {
        if let Some(task) = lock(&self.shared.task).take() {
            if !task.is_finished() {
                debug!(tag = self.shared.tag.name(), "operation aborted");
            }
            task.abort();
        }
    }

    /// Whether `end` was already called on this token.
    pub fn is_ended(&self) -> bool {
        self.shared.end_gate.is_entered()
    }

    /// Whether both handles refer to the same operation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Tag given to `begin`.
    pub fn tag(&self) -> OperationTag {
        self.shared.tag
    }

    /// Caller state given to `begin`.
    pub fn state(&self) -> Option<&AsyncState> {
        self.shared.state.as_ref()
    }

    /// Timeout given to `begin`.
    pub fn timeout(&self) -> Option<Duration> {
        self.shared.timeout
    }

    /// Whether the operation has an outcome (result, error or timeout).
    pub fn is_completed(&self) -> bool {
        !matches!(*lock(&self.shared.outcome), Outcome::Pending)
    }

    /// Whether the operation completed during `begin`.
    pub fn completed_synchronously(&self) -> bool {
        self.shared.completed_synchronously.load(Ordering::Acquire)
    }

    /// Block until the operation has an outcome, without consuming it.
    pub fn wait(&self) {
        let mut slot = lock(&self.shared.outcome);
        while matches!(*slot, Outcome::Pending) {
            slot = self
                .shared
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `limit`. Returns whether the operation completed.
    pub fn wait_timeout(&self, limit: Duration) -> bool {
        let slot = lock(&self.shared.outcome);
        let (slot, _) = self
            .shared
            .ready
            .wait_timeout_while(slot, limit, |slot| matches!(slot, Outcome::Pending))
            .unwrap_or_else(PoisonError::into_inner);
        !matches!(*slot, Outcome::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Instant;
    use tokio::runtime::{Builder, Runtime};

    const READ: OperationTag = OperationTag::new("read");
    const WRITE: OperationTag = OperationTag::new("write");

    fn runtime() -> Runtime {
        Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    fn counting_callback<T>(count: &Arc<AtomicUsize>) -> Option<AsyncCallback<T>> {
        let count = Arc::clone(count);
        Some(Box::new(move |_: &AsyncResult<T>| {
            count.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_single_entry_gate() {
        let gate = SingleEntryGate::new();
        assert!(!gate.is_entered());
        assert!(gate.try_enter());
        assert!(!gate.try_enter());
        assert!(gate.is_entered());
    }

    #[test]
    fn test_single_entry_gate_concurrent() {
        let gate = Arc::new(SingleEntryGate::new());
        let winners = Arc::new(AtomicUsize::new(0));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if gate.try_enter() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_synchronous_completion() {
        let rt = runtime();
        let calls = Arc::new(AtomicUsize::new(0));

        let token = AsyncResult::begin(
            rt.handle(),
            counting_callback(&calls),
            None,
            async { Ok(7u32) },
            READ,
            None,
        );

        // Callback ran on this thread before begin returned.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(token.completed_synchronously());
        assert!(token.is_completed());
        assert_eq!(token.end(READ).unwrap(), 7);
    }

    #[test]
    fn test_asynchronous_completion() {
        let rt = runtime();
        let (tx, rx) = mpsc::channel();

        let token = AsyncResult::begin(
            rt.handle(),
            Some(Box::new(move |token: &AsyncResult<u32>| {
                tx.send(token.completed_synchronously()).unwrap();
            })),
            None,
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(9u32)
            },
            READ,
            None,
        );

        assert!(!token.completed_synchronously());
        assert_eq!(token.end(READ).unwrap(), 9);
        assert!(!rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }

    #[test]
    fn test_end_twice_fails() {
        let rt = runtime();

        let sync = AsyncResult::begin(rt.handle(), None, None, async { Ok(1u8) }, READ, None);
        assert!(sync.end(READ).is_ok());
        assert!(matches!(
            sync.end(READ),
            Err(OxiFlateError::InvalidOperation { .. })
        ));

        let pending = AsyncResult::begin(
            rt.handle(),
            None,
            None,
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(2u8)
            },
            READ,
            None,
        );
        assert_eq!(pending.end(READ).unwrap(), 2);
        assert!(matches!(
            pending.clone().end(READ),
            Err(OxiFlateError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_tag_mismatch_rejected() {
        let rt = runtime();
        let token = AsyncResult::begin(rt.handle(), None, None, async { Ok(5i64) }, READ, None);

        assert!(token.is_completed());
        assert!(matches!(
            token.end(WRITE),
            Err(OxiFlateError::InvalidArgument { .. })
        ));
        // A rejected End does not consume the token.
        assert_eq!(token.end(READ).unwrap(), 5);
    }

    #[test]
    fn test_error_deferred_to_end() {
        let rt = runtime();
        let token: AsyncResult<()> = AsyncResult::begin(
            rt.handle(),
            None,
            None,
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Err(OxiFlateError::corrupted(12, "bad block type"))
            },
            READ,
            None,
        );

        match token.end(READ) {
            Err(OxiFlateError::CorruptedData { offset, message }) => {
                assert_eq!(offset, 12);
                assert_eq!(message, "bad block type");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_timeout_on_never_completing_operation() {
        let rt = runtime();
        let calls = Arc::new(AtomicUsize::new(0));
        let timeout = Duration::from_millis(50);
        let started = Instant::now();

        let token = AsyncResult::begin(
            rt.handle(),
            counting_callback(&calls),
            None,
            std::future::pending::<Result<u32>>(),
            READ,
            Some(timeout),
        );

        assert!(matches!(token.end(READ), Err(OxiFlateError::Timeout { after }) if after == timeout));
        assert!(started.elapsed() >= timeout);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_abort_drops_abandoned_operation() {
        struct OnDrop(mpsc::Sender<()>);
        impl Drop for OnDrop {
            fn drop(&mut self) {
                let _ = self.0.send(());
            }
        }

        let rt = runtime();
        let (tx, rx) = mpsc::channel();
        let guard = OnDrop(tx);
        let token = AsyncResult::begin(
            rt.handle(),
            None,
            None,
            async move {
                let _guard = guard;
                std::future::pending::<Result<u32>>().await
            },
            READ,
            Some(Duration::from_millis(20)),
        );

        assert!(matches!(token.end(READ), Err(OxiFlateError::Timeout { .. })));
        assert!(token.is_ended());
        assert!(rx.try_recv().is_err());

        token.abort();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        token.abort();
    }

    #[test]
    fn test_ptr_eq() {
        let rt = runtime();
        let first = AsyncResult::begin(rt.handle(), None, None, async { Ok(1) }, READ, None);
        let second = AsyncResult::begin(rt.handle(), None, None, async { Ok(1) }, READ, None);
        assert!(first.ptr_eq(&first.clone()));
        assert!(!first.ptr_eq(&second));
        assert!(!first.is_ended());
    }

    #[test]
    fn test_late_completion_does_not_alter_timed_out_token() {
        let rt = runtime();
        let calls = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let token = AsyncResult::begin(
            rt.handle(),
            counting_callback(&calls),
            None,
            async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(1u32)
            },
            READ,
            Some(Duration::from_millis(20)),
        );

        assert!(matches!(token.end(READ), Err(OxiFlateError::Timeout { .. })));

        std::thread::sleep(Duration::from_millis(300));
        assert!(finished.load(Ordering::SeqCst));
        assert!(token.is_completed());
        assert!(matches!(
            token.end(READ),
            Err(OxiFlateError::InvalidOperation { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completion_before_timeout_wins() {
        let rt = runtime();
        let calls = Arc::new(AtomicUsize::new(0));

        let token = AsyncResult::begin(
            rt.handle(),
            counting_callback(&calls),
            None,
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok("done")
            },
            READ,
            Some(Duration::from_secs(10)),
        );

        assert_eq!(token.end(READ).unwrap(), "done");
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_state_and_end_inside_callback() {
        let rt = runtime();
        let (tx, rx) = mpsc::channel();
        let state: AsyncState = Arc::new(41u32);

        AsyncResult::begin(
            rt.handle(),
            Some(Box::new(move |token: &AsyncResult<u32>| {
                let base = token
                    .state()
                    .and_then(|state| state.downcast_ref::<u32>())
                    .copied()
                    .unwrap_or_default();
                let value = token.end(READ).map(|v| v + base);
                tx.send(value.ok()).unwrap();
            })),
            Some(state),
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(1u32)
            },
            READ,
            None,
        );

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), Some(42));
    }

    #[test]
    fn test_wait_timeout() {
        let rt = runtime();
        let token = AsyncResult::begin(
            rt.handle(),
            None,
            None,
            std::future::pending::<Result<()>>(),
            READ,
            None,
        );
        assert!(!token.wait_timeout(Duration::from_millis(10)));
        assert!(!token.is_completed());
    }
}
