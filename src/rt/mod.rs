//! Runtime abstractions the pool is built on.
//!
//! The pool itself never touches a clock or a synchronization primitive
//! directly; it asks a [`Backend`] for them. The [`tokio`] submodule provides
//! the implementation used by default.

use std::error::Error as StdError;
use std::fmt;
use std::time::{Duration, Instant};

use futures_core::future::BoxFuture;

pub mod tokio;

/// Platform abstraction supplying the monotonic clock and the synchronization
/// primitives the pool coordinates with.
pub trait Backend: Send + Sync + 'static {
    /// Monotonic clock reading.
    fn now(&self) -> Instant;

    /// Create a mutual-exclusion lock.
    fn create_lock(&self) -> Box<dyn Lock>;

    /// Create a counting semaphore holding `permits` permits.
    fn create_semaphore(&self, permits: usize) -> Box<dyn Semaphore>;
}

/// An asynchronous mutual-exclusion primitive with a scoped guard.
pub trait Lock: Send + Sync {
    /// Wait until the lock is owned. Dropping the guard releases it.
    fn acquire(&self) -> BoxFuture<'_, LockGuard<'_>>;
}

/// Owned while the lock is held; releases on drop.
pub struct LockGuard<'a>(Box<dyn Release + 'a>);

impl<'a> LockGuard<'a> {
    /// Wrap a guard object whose drop releases the underlying lock.
    pub fn new<G: Send + 'a>(guard: G) -> LockGuard<'a> {
        LockGuard(Box::new(guard))
    }
}

impl fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LockGuard")
    }
}

/// Object-safe stand-in for "anything whose drop releases the lock".
#[doc(hidden)]
pub trait Release: Send {}

impl<G: Send> Release for G {}

/// A bounded counting semaphore whose acquire can carry a deadline.
pub trait Semaphore: Send + Sync {
    /// Take one permit, waiting at most `timeout` when one is given.
    fn acquire(&self, timeout: Option<Duration>) -> BoxFuture<'_, Result<(), AcquireTimedOut>>;

    /// Return one permit. Must pair with a prior successful `acquire`.
    fn release(&self);
}

/// Error returned when [`Semaphore::acquire`] exceeds its deadline.
#[derive(Debug)]
pub struct AcquireTimedOut;

impl fmt::Display for AcquireTimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("semaphore acquire timed out")
    }
}

impl StdError for AcquireTimedOut {}

/// Semaphore for the unbounded case; acquire and release are no-ops.
#[derive(Debug, Default)]
pub struct NullSemaphore;

impl Semaphore for NullSemaphore {
    fn acquire(&self, _timeout: Option<Duration>) -> BoxFuture<'_, Result<(), AcquireTimedOut>> {
        Box::pin(std::future::ready(Ok(())))
    }

    fn release(&self) {}
}
