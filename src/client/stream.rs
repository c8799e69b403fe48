use std::fmt;
use std::sync::{Arc, Weak};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::error::{Error, Result};

use super::connection::{ByteStream, ConnectionState, PoolableConnection};
use super::pool::PoolInner;

/// Response body handed out by the pool.
///
/// Wraps the connection's stream so that closing it hands the connection back
/// to the pool for reclassification. Iterating chunks holds no pool lock.
pub struct PooledBody {
    stream: Box<dyn ByteStream>,
    connection: Arc<dyn PoolableConnection>,
    pool: Weak<PoolInner>,
    closed: bool,
}

impl PooledBody {
    pub(crate) fn new(
        stream: Box<dyn ByteStream>,
        connection: Arc<dyn PoolableConnection>,
        pool: Weak<PoolInner>,
    ) -> PooledBody {
        PooledBody {
            stream,
            connection,
            pool,
            closed: false,
        }
    }

    /// The next body chunk, or `None` once the body is exhausted.
    pub async fn chunk(&mut self) -> Option<Result<Bytes>> {
        self.stream.chunk().await.map(|chunk| chunk.map_err(Error::body))
    }

    /// Drain the remaining chunks into one buffer.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.chunk().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Close the body.
    ///
    /// Closes the inner stream first, then notifies the pool so the
    /// connection can be reclassified. The pool is notified exactly once,
    /// whether or not the inner close succeeded; an inner close error is
    /// returned afterwards.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.stream.close().await;
        if let Some(pool) = self.pool.upgrade() {
            pool.response_closed(&self.connection).await;
        }
        result.map_err(Error::body)
    }
}

impl Drop for PooledBody {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        trace!("response body dropped without close");
        // Transports cannot be closed from here. Evicting an already-closed
        // connection is the lock-only part of the close callback, so that
        // much still happens.
        if self.connection.state() == ConnectionState::Closed {
            if let Some(pool) = self.pool.upgrade() {
                pool.remove_connection(&self.connection);
            }
        }
    }
}

impl fmt::Debug for PooledBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBody")
            .field("closed", &self.closed)
            .finish()
    }
}
