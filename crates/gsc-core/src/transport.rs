//! Transport abstraction and request URL construction.
//!
//! Every control-plane call is a single `GET` with query parameters. The
//! [`Transport`] trait is the only network seam: production code uses
//! [`crate::http::HttpTransport`], tests substitute a scripted or fake host.

use std::net::Ipv6Addr;

use async_trait::async_trait;
use bytes::Bytes;
use url::form_urlencoded::byte_serialize;
use uuid::Uuid;

use crate::errors::{ClientError, TransportError};
use crate::identity::ClientIdentity;

/// TLS control port. Hosts hardcode this value.
pub const HTTPS_PORT: u16 = 47984;
/// Plain HTTP port used before pairing completes.
pub const HTTP_PORT: u16 = 47989;

/// Trait for issuing control-plane requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the response body.
    async fn get(&self, url: &str) -> Result<Bytes, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn port(self) -> u16 {
        match self {
            Scheme::Http => HTTP_PORT,
            Scheme::Https => HTTPS_PORT,
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A control-plane request URL.
///
/// Created with the common `uniqueid` and a fresh `uuid` already set; the
/// host expects a new uuid on every request.
#[derive(Debug, Clone)]
pub struct RequestUrl {
    scheme: Scheme,
    host: String,
    endpoint: &'static str,
    query: Vec<(&'static str, String)>,
}

impl RequestUrl {
    pub fn new(scheme: Scheme, host: &str, endpoint: &'static str, identity: &ClientIdentity) -> Self {
        Self {
            scheme,
            host: url_host(host),
            endpoint,
            query: vec![
                ("uniqueid", identity.as_str().to_string()),
                ("uuid", Uuid::new_v4().to_string()),
            ],
        }
    }

    /// Append a query parameter.
    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    /// Value of the first parameter named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn build(&self) -> String {
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, byte_serialize(v.as_bytes()).collect::<String>()))
            .collect::<Vec<_>>()
            .join("&");
        format!(
            "{}://{}:{}/{}?{}",
            self.scheme,
            self.host,
            self.scheme.port(),
            self.endpoint,
            query
        )
    }
}

/// Bracket bare IPv6 literals so they can carry a port.
fn url_host(host: &str) -> String {
    if is_ipv6_literal(host) {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

/// True for `fe80::1` and scoped forms such as `fe80::1%eth0`.
fn is_ipv6_literal(host: &str) -> bool {
    let addr = host.split_once('%').map_or(host, |(addr, _)| addr);
    addr.parse::<Ipv6Addr>().is_ok()
}

/// Check a user-supplied host before any request is built.
///
/// Accepts a hostname, an IPv4 address, or an IPv6 literal with or without
/// brackets. The control ports are fixed, so a trailing `:port` is rejected.
pub fn validate_address(address: &str) -> Result<(), ClientError> {
    let invalid = |reason: &str| -> Result<(), ClientError> {
        Err(ClientError::InvalidAddress(format!("{address:?}: {reason}")))
    };

    if address.is_empty() {
        return invalid("empty host");
    }
    if let Some(inner) = address.strip_prefix('[') {
        return match inner.strip_suffix(']') {
            Some(addr) if is_ipv6_literal(addr) => Ok(()),
            _ if inner.contains("]:") => invalid("host must not include a port"),
            _ => invalid("malformed IPv6 literal"),
        };
    }
    if address.contains(':') && !is_ipv6_literal(address) {
        return invalid("host must not include a port");
    }
    if address.contains(|c: char| matches!(c, '/' | '?' | '#' | '@') || c.is_whitespace()) {
        return invalid("not a bare host name or address");
    }
    Ok(())
}
