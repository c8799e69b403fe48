//! Tokio-backed runtime support.

use std::time::{Duration, Instant};

use futures_core::future::BoxFuture;

use super::{AcquireTimedOut, Backend, Lock, LockGuard, Semaphore};

/// A [`Backend`] backed by the Tokio runtime.
#[derive(Clone, Debug, Default)]
pub struct TokioBackend {}

impl TokioBackend {
    /// Create a new backend.
    pub fn new() -> Self {
        Self {}
    }
}

impl Backend for TokioBackend {
    fn now(&self) -> Instant {
        // Goes through tokio's clock so that paused-time tests see a
        // consistent view of "now".
        tokio::time::Instant::now().into_std()
    }

    fn create_lock(&self) -> Box<dyn Lock> {
        Box::new(TokioLock::default())
    }

    fn create_semaphore(&self, permits: usize) -> Box<dyn Semaphore> {
        Box::new(TokioSemaphore::new(permits))
    }
}

/// Mutual exclusion via [`tokio::sync::Mutex`].
#[derive(Debug, Default)]
pub struct TokioLock {
    inner: tokio::sync::Mutex<()>,
}

impl Lock for TokioLock {
    fn acquire(&self) -> BoxFuture<'_, LockGuard<'_>> {
        Box::pin(async move { LockGuard::new(self.inner.lock().await) })
    }
}

/// Counting semaphore via [`tokio::sync::Semaphore`].
#[derive(Debug)]
pub struct TokioSemaphore {
    inner: tokio::sync::Semaphore,
}

impl TokioSemaphore {
    /// Create a semaphore holding `permits` permits.
    pub fn new(permits: usize) -> Self {
        Self {
            inner: tokio::sync::Semaphore::new(permits),
        }
    }
}

impl Semaphore for TokioSemaphore {
    fn acquire(&self, timeout: Option<Duration>) -> BoxFuture<'_, Result<(), AcquireTimedOut>> {
        Box::pin(async move {
            let acquired = match timeout {
                Some(limit) => match ::tokio::time::timeout(limit, self.inner.acquire()).await {
                    Ok(acquired) => acquired,
                    Err(_elapsed) => return Err(AcquireTimedOut),
                },
                None => self.inner.acquire().await,
            };
            match acquired {
                Ok(permit) => {
                    // The permit's lifetime is managed by the pool, not tied
                    // to a guard.
                    permit.forget();
                    Ok(())
                }
                // The semaphore is never closed.
                Err(_closed) => Err(AcquireTimedOut),
            }
        })
    }

    fn release(&self) {
        self.inner.add_permits(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rt::NullSemaphore;

    #[tokio::test(start_paused = true)]
    async fn semaphore_acquire_times_out() {
        let semaphore = TokioSemaphore::new(1);
        semaphore.acquire(None).await.unwrap();

        let err = semaphore
            .acquire(Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));

        semaphore.release();
        semaphore.acquire(Some(Duration::from_millis(50))).await.unwrap();
    }

    #[tokio::test]
    async fn null_semaphore_never_blocks() {
        let semaphore = NullSemaphore;
        for _ in 0..64 {
            semaphore.acquire(Some(Duration::from_millis(1))).await.unwrap();
        }
        semaphore.release();
    }

    #[tokio::test]
    async fn lock_is_exclusive() {
        let lock = TokioLock::default();
        let guard = lock.acquire().await;

        let contended = ::tokio::time::timeout(Duration::from_millis(10), lock.acquire()).await;
        assert!(contended.is_err());

        drop(guard);
        let _guard = lock.acquire().await;
    }
}
