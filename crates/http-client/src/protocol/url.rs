//! Absolute URL decomposition.
//!
//! Only the `scheme://host[:port][/path]` shape is accepted. Parsing is
//! delegated to `http::Uri`; this module adds the defaults and the checks the
//! client relies on:
//!
//! - the scheme must be `http` or `https`
//! - an explicit port must be in `1..=65535`
//! - user info (`user@host`) is rejected
//! - a missing path becomes `/`, an existing one is passed through untouched

use std::fmt;
use std::str::FromStr;

use http::Uri;

use crate::protocol::ClientError;

/// The transport scheme of a parsed URL.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// The port used when the URL does not name one.
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pieces of an absolute URL the client needs to reach a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
}

impl UrlParts {
    /// Parses an absolute `http` or `https` URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] when the input is not of the form
    /// `scheme://host[:port][/path]`, names another scheme, or carries a port
    /// outside `1..=65535`.
    pub fn parse(url: &str) -> Result<Self, ClientError> {
        let uri = Uri::from_str(url).map_err(|e| ClientError::invalid_url(url, e))?;

        let scheme = match uri.scheme_str() {
            Some(s) if s.eq_ignore_ascii_case("http") => Scheme::Http,
            Some(s) if s.eq_ignore_ascii_case("https") => Scheme::Https,
            Some(s) => return Err(ClientError::invalid_url(url, format!("unsupported scheme {s}"))),
            None => return Err(ClientError::invalid_url(url, "missing scheme")),
        };

        let authority = uri.authority().ok_or_else(|| ClientError::invalid_url(url, "missing host"))?;
        if authority.as_str().contains('@') {
            return Err(ClientError::invalid_url(url, "user info is not supported"));
        }

        let host = authority.host();
        if host.is_empty() {
            return Err(ClientError::invalid_url(url, "missing host"));
        }

        // authority is `host[:port]` once user info is ruled out
        let port = match authority.as_str()[host.len()..].strip_prefix(':') {
            Some(port) => parse_port(port).ok_or_else(|| ClientError::invalid_url(url, format!("invalid port {port:?}")))?,
            None => scheme.default_port(),
        };

        let path = match uri.path_and_query().map(|p| p.as_str()) {
            None | Some("") => "/".to_string(),
            Some(p) if p.starts_with('/') => p.to_string(),
            Some(p) => format!("/{p}"),
        };

        Ok(Self { scheme, host: host.to_string(), port, path })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The request target: path plus query, never empty.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true if the port is the default for the scheme.
    pub fn is_default_port(&self) -> bool {
        self.port == self.scheme.default_port()
    }
}

impl FromStr for UrlParts {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UrlParts::parse(s)
    }
}

impl fmt::Display for UrlParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}

fn parse_port(port: &str) -> Option<u16> {
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    port.parse::<u16>().ok().filter(|p| *p > 0)
}
