use std::fmt;

use http::Uri;

use crate::error::{Error, Result};

/// URL scheme of an origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Cleartext HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Scheme {
    /// The scheme as it appears in a URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// The port implied when a URL carries none.
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// The coalescing unit for connection reuse: scheme, host and port.
///
/// Two requests share pooled connections exactly when their origins compare
/// equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Origin {
    /// URL scheme.
    pub scheme: Scheme,
    /// Host name or address, as written in the URL.
    pub host: String,
    /// Port, explicit or defaulted from the scheme.
    pub port: u16,
}

impl Origin {
    /// Build an origin from its parts.
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Origin {
        Origin {
            scheme,
            host: host.into(),
            port,
        }
    }

    /// Derive the origin of a request URI.
    ///
    /// Fails when the URI is relative, has no host, or uses a scheme other
    /// than `http` or `https`.
    pub fn from_uri(uri: &Uri) -> Result<Origin> {
        let scheme = match uri.scheme_str() {
            Some("http") => Scheme::Http,
            Some("https") => Scheme::Https,
            Some(other) => return Err(Error::uri(format!("unsupported scheme {other:?}"))),
            None => return Err(Error::uri("relative URI has no origin")),
        };
        let host = uri.host().ok_or_else(|| Error::uri("URI has no host"))?;
        let port = uri.port_u16().unwrap_or_else(|| scheme.default_port());
        Ok(Origin::new(scheme, host, port))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The scheme's default port is elided from the URL form.
        if self.port == self.scheme.default_port() {
            write!(f, "{}://{}", self.scheme.as_str(), self.host)
        } else {
            write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin_of(uri: &str) -> Origin {
        Origin::from_uri(&uri.parse::<Uri>().unwrap()).unwrap()
    }

    #[test]
    fn ports_default_from_scheme() {
        assert_eq!(origin_of("http://example.org/a"), Origin::new(Scheme::Http, "example.org", 80));
        assert_eq!(origin_of("https://example.org/a"), Origin::new(Scheme::Https, "example.org", 443));
        assert_eq!(
            origin_of("https://example.org:8443/a"),
            Origin::new(Scheme::Https, "example.org", 8443)
        );
    }

    #[test]
    fn path_and_query_are_irrelevant() {
        assert_eq!(origin_of("http://example.org/a?x=1"), origin_of("http://example.org/b"));
    }

    #[test]
    fn rejects_unusable_uris() {
        let err = Origin::from_uri(&"ftp://example.org/".parse::<Uri>().unwrap()).unwrap_err();
        assert!(err.is_uri());
        let err = Origin::from_uri(&"/just/a/path".parse::<Uri>().unwrap()).unwrap_err();
        assert!(err.is_uri());
    }

    #[test]
    fn url_form_elides_default_ports() {
        assert_eq!(origin_of("http://example.org/").to_string(), "http://example.org");
        assert_eq!(origin_of("https://example.org/").to_string(), "https://example.org");
        assert_eq!(
            origin_of("http://example.org:8080/").to_string(),
            "http://example.org:8080"
        );
        // An explicit default port still folds into the bare form.
        assert_eq!(origin_of("http://example.org:80/").to_string(), "http://example.org");
    }
}
