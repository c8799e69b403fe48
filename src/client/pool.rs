use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rustls::ClientConfig;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::rt::tokio::TokioBackend;
use crate::rt::{Backend, Lock, NullSemaphore, Semaphore};

use super::connection::{
    Connect, ConnectConfig, ConnectionError, ConnectionState, PoolableConnection,
};
use super::origin::Origin;
use super::request::{Request, Response};
use super::stream::PooledBody;

/// Idle expiry is checked at most this often.
const KEEPALIVE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

type Conn = Arc<dyn PoolableConnection>;

/// Pool configuration.
///
/// All limits are optional; the default is an unbounded pool with HTTP/2
/// coalescing disabled.
#[derive(Clone, Default)]
pub struct Config {
    /// TLS client material, passed verbatim to the connector.
    pub tls: Option<Arc<ClientConfig>>,
    /// Cap on live connections. `None` is unbounded.
    pub max_connections: Option<usize>,
    /// When the pool holds more than this many connections, a connection
    /// returning to idle is dropped instead of kept alive.
    pub max_keepalive: Option<usize>,
    /// How long an idle connection may linger before the sweep closes it.
    pub keepalive_expiry: Option<Duration>,
    /// Enable HTTP/2 coalescing and pending-connection reuse.
    pub http2: bool,
    /// Local address to bind before dialing, passed verbatim to the
    /// connector.
    pub local_addr: Option<IpAddr>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("tls", &self.tls.is_some())
            .field("max_connections", &self.max_connections)
            .field("max_keepalive", &self.max_keepalive)
            .field("keepalive_expiry", &self.keepalive_expiry)
            .field("http2", &self.http2)
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

/// A connection pool for making HTTP requests.
///
/// Requests to the same origin reuse idle HTTP/1.1 connections serially and
/// share HTTP/2 connections concurrently; requests racing the first handshake
/// to an HTTP/2-capable origin coalesce onto a single dial. Live connections
/// are bounded by [`Config::max_connections`], and idle ones are retired by
/// the keep-alive sweep.
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

pub(crate) struct PoolInner {
    config: Config,
    connect_config: ConnectConfig,
    connector: Box<dyn Connect>,
    backend: Box<dyn Backend>,
    // Bounds live connections. A permit is held for exactly as long as a
    // connection sits in the index.
    semaphore: Box<dyn Semaphore>,
    // Serializes get-or-create so that concurrent requests to the same
    // HTTP/2 origin land on one connection.
    acquire_lock: Box<dyn Lock>,
    index: Mutex<Index>,
    next_keepalive_check: Mutex<Instant>,
}

#[derive(Default)]
struct Index {
    by_origin: HashMap<Origin, Vec<Conn>>,
}

impl Index {
    fn insert(&mut self, connection: Conn) {
        self.by_origin
            .entry(connection.origin().clone())
            .or_default()
            .push(connection);
    }

    // Identity-based removal; true if the connection was present under its
    // origin.
    fn remove(&mut self, connection: &Conn) -> bool {
        let origin = connection.origin();
        let Some(list) = self.by_origin.get_mut(origin) else {
            return false;
        };
        let Some(at) = list.iter().position(|c| same_connection(c, connection)) else {
            return false;
        };
        list.swap_remove(at);
        if list.is_empty() {
            self.by_origin.remove(origin);
        }
        true
    }

    fn for_origin(&self, origin: &Origin) -> Vec<Conn> {
        self.by_origin.get(origin).cloned().unwrap_or_default()
    }

    fn all(&self) -> Vec<Conn> {
        self.by_origin.values().flatten().cloned().collect()
    }

    fn len(&self) -> usize {
        self.by_origin.values().map(Vec::len).sum()
    }
}

// `Arc::ptr_eq` on trait objects also compares vtable pointers, which are not
// unique across codegen units; compare the data pointers.
fn same_connection(a: &Conn, b: &Conn) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl ConnectionPool {
    /// Create a pool over the Tokio backend.
    pub fn new<C>(config: Config, connector: C) -> ConnectionPool
    where
        C: Connect,
    {
        ConnectionPool::with_backend(config, connector, TokioBackend::new())
    }

    /// Create a pool over a custom [`Backend`].
    pub fn with_backend<C, B>(config: Config, connector: C, backend: B) -> ConnectionPool
    where
        C: Connect,
        B: Backend,
    {
        let semaphore: Box<dyn Semaphore> = match config.max_connections {
            Some(limit) => backend.create_semaphore(limit),
            None => Box::new(NullSemaphore),
        };
        let acquire_lock = backend.create_lock();
        let connect_config = ConnectConfig {
            http2: config.http2,
            tls: config.tls.clone(),
            local_addr: config.local_addr,
        };
        let next_keepalive_check = Mutex::new(backend.now());

        ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                connect_config,
                connector: Box::new(connector),
                backend: Box::new(backend),
                semaphore,
                acquire_lock,
                index: Mutex::new(Index::default()),
                next_keepalive_check,
            }),
        }
    }

    /// Issue a request, reusing a pooled connection when one is available.
    ///
    /// The response body must be closed for its connection to come back to
    /// the pool. The only timeout the pool spends itself is
    /// [`Timeouts::pool`][super::Timeouts::pool], while waiting for a slot;
    /// every other budget passes through to the connection.
    pub async fn request(&self, request: Request) -> Result<Response> {
        let origin = Origin::from_uri(&request.uri)?;

        if self.inner.config.keepalive_expiry.is_some() {
            self.inner.sweep_expired().await;
        }

        let (connection, head, stream) = loop {
            let connection = {
                // Get-or-create is atomic so that HTTP/2 requests issued in
                // close concurrency end up on the same connection.
                let _guard = self.inner.acquire_lock.acquire().await;
                match self.inner.select_connection(&origin).await {
                    Some(connection) => connection,
                    None => {
                        let connection = self
                            .inner
                            .connector
                            .connect(&origin, &self.inner.connect_config);
                        trace!("created connection for {}", origin);
                        self.inner
                            .add_connection(connection.clone(), request.timeouts.pool)
                            .await?;
                        connection
                    }
                }
            };

            match connection.request(&request).await {
                Ok((head, stream)) => break (connection, head, stream),
                Err(ConnectionError::NewConnectionRequired) => {
                    // Reuse was lost under us, e.g. the server closed a
                    // keep-alive connection we had just selected. The
                    // connection sorts out its own state; pick again.
                    trace!("connection refused the request, selecting again");
                }
                Err(ConnectionError::Request(source)) => {
                    trace!("removing failed connection from pool");
                    self.inner.remove_connection(&connection);
                    return Err(Error::request(source));
                }
            }
        };

        let body = PooledBody::new(stream, connection, Arc::downgrade(&self.inner));
        Ok(Response {
            status: head.status,
            reason: head.reason,
            version: head.version,
            headers: head.headers,
            body,
        })
    }

    /// Close every pooled connection.
    ///
    /// The pool stays usable afterwards; later requests dial fresh.
    pub async fn close(&self) {
        let connections = self.inner.index.lock().unwrap().all();
        for connection in &connections {
            self.inner.remove_connection(connection);
        }
        for connection in connections {
            connection.close().await;
        }
    }

    /// Best-effort snapshot of pooled connections, keyed by origin URL.
    pub fn connection_info(&self) -> HashMap<String, Vec<String>> {
        let index = self.inner.index.lock().unwrap();
        index
            .by_origin
            .iter()
            .map(|(origin, connections)| {
                let summaries = connections.iter().map(|c| c.info()).collect();
                (origin.to_string(), summaries)
            })
            .collect()
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("connections", &self.inner.index.lock().unwrap().len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl PoolInner {
    // Runs under the acquisition lock. Scans the origin's connections for a
    // reusable or shareable one, evicting the dead along the way.
    async fn select_connection(&self, origin: &Origin) -> Option<Conn> {
        let mut seen_http11 = false;
        let mut pending = None;
        let mut reuse = None;
        let mut to_close = Vec::new();

        let candidates = self.index.lock().unwrap().for_origin(origin);
        for connection in candidates {
            if connection.is_http11() {
                seen_http11 = true;
            }
            match connection.state() {
                ConnectionState::Idle => {
                    if connection.is_connection_dropped() {
                        trace!("removing dropped idle connection for {}", origin);
                        self.remove_connection(&connection);
                        to_close.push(connection);
                    } else {
                        reuse = Some(connection);
                    }
                }
                ConnectionState::Active if connection.is_http2() => {
                    reuse = Some(connection);
                }
                ConnectionState::Pending => {
                    pending = Some(connection);
                }
                // Terminal connections never leave the index on their own.
                ConnectionState::Closed => {
                    trace!("removing closed connection for {}", origin);
                    self.remove_connection(&connection);
                }
                _ => {}
            }
        }

        let selected = match reuse {
            Some(connection) => {
                // Ready is a one-shot reservation that keeps concurrent
                // selectors off an HTTP/1.1 reuse.
                trace!("reusing connection for {}", origin);
                connection.mark_as_ready();
                connection.set_expires_at(None);
                Some(connection)
            }
            // A pending connection may be shared, but only while nothing
            // suggests this origin speaks HTTP/1.1.
            None if self.config.http2 && !seen_http11 => {
                if pending.is_some() {
                    trace!("sharing pending connection for {}", origin);
                }
                pending
            }
            None => None,
        };

        for connection in to_close {
            connection.close().await;
        }

        selected
    }

    async fn add_connection(&self, connection: Conn, pool_timeout: Option<Duration>) -> Result<()> {
        trace!("adding connection to pool");
        self.semaphore
            .acquire(pool_timeout)
            .await
            .map_err(|_| Error::pool_timeout())?;
        // No await between the permit grant and the insert, so cancellation
        // cannot strand a permit outside the index.
        self.index.lock().unwrap().insert(connection);
        Ok(())
    }

    pub(crate) fn remove_connection(&self, connection: &Conn) {
        let mut index = self.index.lock().unwrap();
        if index.remove(connection) {
            self.semaphore.release();
        }
    }

    // Invoked when a response body is closed and its connection settles into
    // a new state.
    pub(crate) async fn response_closed(&self, connection: &Conn) {
        let mut remove = false;
        let mut close = false;

        match connection.state() {
            ConnectionState::Closed => remove = true,
            ConnectionState::Idle => {
                let total = self.index.lock().unwrap().len();
                if self.config.max_keepalive.is_some_and(|max| total > max) {
                    debug!("dropping idle connection over the keep-alive limit");
                    remove = true;
                    close = true;
                } else if let Some(expiry) = self.config.keepalive_expiry {
                    connection.set_expires_at(Some(self.backend.now() + expiry));
                }
            }
            // Still usable, e.g. an HTTP/2 connection with other streams in
            // flight.
            _ => {}
        }

        // Removal precedes the close so no selector can pick a connection
        // that is mid-close.
        if remove {
            self.remove_connection(connection);
        }
        if close {
            connection.close().await;
        }
    }

    // Retire idle connections whose keep-alive deadline has passed. Rate
    // limited; most calls return without scanning.
    async fn sweep_expired(&self) {
        let now = self.backend.now();
        {
            let mut next_check = self.next_keepalive_check.lock().unwrap();
            if now < *next_check {
                return;
            }
            *next_check = now + KEEPALIVE_CHECK_INTERVAL;
        }

        let mut to_close = Vec::new();
        let connections = self.index.lock().unwrap().all();
        for connection in connections {
            let expired = connection.state() == ConnectionState::Idle
                && connection.expires_at().is_some_and(|deadline| now > deadline);
            if expired {
                trace!("sweeping expired idle connection for {}", connection.origin());
                self.remove_connection(&connection);
                to_close.push(connection);
            }
        }
        for connection in to_close {
            connection.close().await;
        }
    }
}
