//! HTTP client connection pooling.
//!
//! [`ConnectionPool`] is the dispatch and lifecycle brain between a
//! request-issuing client and its transport connections. The connections
//! themselves (dialing, TLS, framing) live behind the [`PoolableConnection`]
//! and [`Connect`] traits.

pub mod connection;
pub mod origin;
pub mod pool;
pub mod request;
pub mod stream;

pub use self::connection::{
    ByteStream, Connect, ConnectConfig, ConnectionError, ConnectionState, PoolableConnection,
};
pub use self::origin::{Origin, Scheme};
pub use self::pool::{Config, ConnectionPool};
pub use self::request::{Request, Response, ResponseHead, Timeouts};
pub use self::stream::PooledBody;
