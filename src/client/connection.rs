use std::error::Error as StdError;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures_core::future::BoxFuture;
use rustls::ClientConfig;

use crate::error::BoxError;

use super::origin::Origin;
use super::request::{Request, ResponseHead};

/// Lifecycle of a pooled connection.
///
/// `Ready` is a one-shot reservation: an HTTP/1.1 connection in this state
/// must not be selected again until it has gone back through `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Dialing or handshaking; not yet usable.
    Pending,
    /// At least one request in flight. HTTP/2 connections may accept more.
    Active,
    /// No in-flight work; eligible for reuse or expiry.
    Idle,
    /// Reserved for an imminent request.
    Ready,
    /// Terminal; the connection must leave the pool.
    Closed,
}

/// Error surfaced by [`PoolableConnection::request`].
#[derive(Debug)]
pub enum ConnectionError {
    /// The connection cannot take this request. The pool selects or dials
    /// another connection and tries again; this never reaches the caller.
    NewConnectionRequired,
    /// The request failed on the wire.
    Request(BoxError),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::NewConnectionRequired => {
                f.write_str("connection cannot accept another request")
            }
            ConnectionError::Request(source) => write!(f, "request failed: {source}"),
        }
    }
}

impl StdError for ConnectionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConnectionError::NewConnectionRequired => None,
            ConnectionError::Request(source) => Some(&**source as _),
        }
    }
}

/// A lazy sequence of response body chunks.
pub trait ByteStream: Send + 'static {
    /// The next chunk, or `None` once the body is exhausted.
    fn chunk(&mut self) -> BoxFuture<'_, Option<Result<Bytes, BoxError>>>;

    /// Close the underlying transport stream.
    fn close(&mut self) -> BoxFuture<'_, Result<(), BoxError>>;
}

/// One transport connection, driven by the pool but implemented elsewhere.
///
/// State transitions are owned by the connection; the pool only requests them
/// through [`mark_as_ready`][Self::mark_as_ready] and the `expires_at` slot.
pub trait PoolableConnection: Send + Sync + 'static {
    /// The origin this connection serves.
    fn origin(&self) -> &Origin;

    /// Current lifecycle state.
    fn state(&self) -> ConnectionState;

    /// Whether the connection resolved to HTTP/1.1.
    fn is_http11(&self) -> bool;

    /// Whether the connection resolved to HTTP/2.
    fn is_http2(&self) -> bool;

    /// Keep-alive deadline, if the pool stamped one.
    fn expires_at(&self) -> Option<Instant>;

    /// Stamp or clear the keep-alive deadline.
    fn set_expires_at(&self, deadline: Option<Instant>);

    /// Cheap, non-blocking probe of transport liveness.
    fn is_connection_dropped(&self) -> bool;

    /// Reserve an `Idle` connection for an imminent request.
    fn mark_as_ready(&self);

    /// Issue a request on this connection.
    fn request<'a>(
        &'a self,
        request: &'a Request,
    ) -> BoxFuture<'a, Result<(ResponseHead, Box<dyn ByteStream>), ConnectionError>>;

    /// Close the connection. Idempotent.
    fn close(&self) -> BoxFuture<'_, ()>;

    /// One-line summary for diagnostics.
    fn info(&self) -> String;
}

/// Dial-time options, built verbatim from the pool configuration.
#[derive(Clone, Default)]
pub struct ConnectConfig {
    /// Offer HTTP/2 during the handshake.
    pub http2: bool,
    /// TLS client material for `https` origins.
    pub tls: Option<Arc<ClientConfig>>,
    /// Local address to bind before connecting.
    pub local_addr: Option<IpAddr>,
}

impl fmt::Debug for ConnectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectConfig")
            .field("http2", &self.http2)
            .field("tls", &self.tls.is_some())
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

/// Creates new connections for the pool.
///
/// Returned connections start in [`ConnectionState::Pending`] and handshake
/// on first use; the pool may hand a pending HTTP/2 connection to several
/// requests at once.
pub trait Connect: Send + Sync + 'static {
    /// Create a connection to `origin`.
    fn connect(&self, origin: &Origin, config: &ConnectConfig) -> Arc<dyn PoolableConnection>;
}
