use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri, Version};

use super::stream::PooledBody;

/// Per-request timeout budgets.
///
/// `pool` bounds how long the request may wait for a pool slot; the other
/// budgets pass through to the connection untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timeouts {
    /// Budget for establishing the transport connection.
    pub connect: Option<Duration>,
    /// Budget for reading from the transport.
    pub read: Option<Duration>,
    /// Budget for writing to the transport.
    pub write: Option<Duration>,
    /// Budget for acquiring a pool slot when the pool is at capacity.
    pub pool: Option<Duration>,
}

/// A request handed to [`ConnectionPool::request`][crate::client::ConnectionPool::request].
#[derive(Clone, Debug)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Absolute request URI; its scheme must be `http` or `https`.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
    /// Timeout budgets for this request.
    pub timeouts: Timeouts,
}

impl Request {
    /// Build a request with empty headers and body and no timeouts.
    pub fn new(method: Method, uri: Uri) -> Request {
        Request {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            timeouts: Timeouts::default(),
        }
    }
}

/// Status line and headers of a response, as produced by a connection.
#[derive(Clone, Debug)]
pub struct ResponseHead {
    /// Response status code.
    pub status: StatusCode,
    /// Reason phrase from the status line, possibly empty.
    pub reason: Bytes,
    /// Negotiated HTTP version.
    pub version: Version,
    /// Response headers.
    pub headers: HeaderMap,
}

/// A response handed out by the pool.
///
/// The body must be [closed][PooledBody::close] for the connection that
/// produced it to return to the pool.
#[derive(Debug)]
pub struct Response {
    /// Response status code.
    pub status: StatusCode,
    /// Reason phrase from the status line, possibly empty.
    pub reason: Bytes,
    /// Negotiated HTTP version.
    pub version: Version,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body, wrapped so its close notifies the pool.
    pub body: PooledBody,
}
