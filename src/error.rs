use std::{error::Error as StdError, fmt};

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The errors that may occur while driving a pooled request.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Uri,
    PoolTimeout,
    Request,
    Body,
}

impl Error {
    fn new(kind: Kind, source: Option<BoxError>) -> Error {
        Error {
            inner: Box::new(Inner { kind, source }),
        }
    }

    pub(crate) fn uri<E: Into<BoxError>>(source: E) -> Error {
        Error::new(Kind::Uri, Some(source.into()))
    }

    pub(crate) fn pool_timeout() -> Error {
        Error::new(Kind::PoolTimeout, None)
    }

    pub(crate) fn request<E: Into<BoxError>>(source: E) -> Error {
        Error::new(Kind::Request, Some(source.into()))
    }

    pub(crate) fn body<E: Into<BoxError>>(source: E) -> Error {
        Error::new(Kind::Body, Some(source.into()))
    }

    /// Returns true if the request URI had no usable origin.
    pub fn is_uri(&self) -> bool {
        matches!(self.inner.kind, Kind::Uri)
    }

    /// Returns true if waiting for a pool slot exceeded the `pool` timeout.
    pub fn is_pool_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::PoolTimeout)
    }

    /// Returns true if a connection failed while handling the request.
    pub fn is_request(&self) -> bool {
        matches!(self.inner.kind, Kind::Request)
    }

    /// Returns true if the response body failed while streaming or closing.
    pub fn is_body(&self) -> bool {
        matches!(self.inner.kind, Kind::Body)
    }

    fn description(&self) -> &str {
        match self.inner.kind {
            Kind::Uri => "request URI has no usable origin",
            Kind::PoolTimeout => "timed out waiting for a pool slot",
            Kind::Request => "error sending request",
            Kind::Body => "error streaming response body",
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("http_pool::Error");
        builder.field("kind", &self.inner.kind);
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())?;
        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|source| &**source as _)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_accessors() {
        assert!(Error::pool_timeout().is_pool_timeout());
        assert!(!Error::pool_timeout().is_request());
        assert!(Error::request("boom").is_request());
        assert!(Error::uri("no host").is_uri());
        assert!(Error::body("reset").is_body());
    }

    #[test]
    fn display_includes_source() {
        let err = Error::request("connection reset by peer");
        let rendered = err.to_string();
        assert!(rendered.starts_with("error sending request"));
        assert!(rendered.contains("connection reset by peer"));
    }
}
