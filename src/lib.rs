//! Connection pooling for HTTP clients.
//!
//! The pool multiplexes requests over a bounded set of reusable transport
//! connections: idle HTTP/1.1 connections are reused serially, HTTP/2
//! connections are shared across concurrent requests to the same origin, and
//! requests racing the first handshake to an origin coalesce onto one dial
//! instead of each opening a socket.
//!
//! Transport concerns (dialing, TLS, byte-level framing) live behind the
//! [`client::PoolableConnection`] trait. The pool owns the decisions around
//! it: when to reuse a connection, when to dial a new one, and when to evict.
//!
//! The clock and synchronization primitives come from an [`rt::Backend`];
//! the Tokio-backed implementation in [`rt::tokio`] is used by default.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod client;
mod error;
pub mod rt;

pub use crate::error::{BoxError, Error, Result};
