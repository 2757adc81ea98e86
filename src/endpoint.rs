//! NFS export endpoints of the form `host:path`.
//!
//! The host is an IPv4 literal, a bracketed IPv6 literal (`[fd00::1]`), or a
//! DNS name. Exactly one `:` outside the brackets separates host from path,
//! and the path must be absolute.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Maximum length of a DNS name, excluding a trailing dot.
const MAX_DNS_NAME_LEN: usize = 253;

static DNS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*\.?$",
    )
    .expect("valid regex")
});

/// Which endpoint constraint a raw string violated.
///
/// Local to endpoint parsing; wrapped into `ProxyError::ConfigMalformed` by
/// the relay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("endpoint is empty")]
    Empty,

    #[error("missing ':' between host and path")]
    MissingColon,

    #[error("more than one ':' in endpoint (wrap IPv6 hosts in brackets, e.g. [fd00::1]:/data)")]
    MultipleColons,

    #[error("host is empty")]
    EmptyHost,

    #[error("'{0}' is not an IP address or DNS name")]
    InvalidHost(String),

    #[error("path is empty")]
    EmptyPath,

    #[error("path '{0}' is not absolute")]
    RelativePath(String),
}

/// Kind of host named by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Dns,
}

/// A validated `host:path` export endpoint.
///
/// Host and path are kept exactly as written, so `to_string()` returns the
/// original input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    kind: HostKind,
    path: String,
}

impl Endpoint {
    /// Host as written, brackets included for IPv6.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn kind(&self) -> HostKind {
        self.kind
    }

    /// Absolute path of the export on the remote server.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.path)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)
    }
}

/// Parse and validate a raw `host:path` string.
pub fn validate(raw: &str) -> Result<Endpoint, EndpointError> {
    if raw.is_empty() {
        return Err(EndpointError::Empty);
    }

    let (host, path) = split_host_path(raw)?;
    let kind = classify_host(host)?;

    if path.is_empty() {
        return Err(EndpointError::EmptyPath);
    }
    if !path.starts_with('/') {
        return Err(EndpointError::RelativePath(path.to_string()));
    }

    Ok(Endpoint {
        host: host.to_string(),
        kind,
        path: path.to_string(),
    })
}

/// Split on the single separator colon, skipping colons inside `[...]`.
fn split_host_path(raw: &str) -> Result<(&str, &str), EndpointError> {
    if let Some(inner) = raw.strip_prefix('[') {
        let close = inner
            .find(']')
            .ok_or_else(|| EndpointError::InvalidHost(raw.to_string()))?;
        // '[' + inner + ']'
        let (host, tail) = raw.split_at(close + 2);
        let path = tail.strip_prefix(':').ok_or(EndpointError::MissingColon)?;
        if path.contains(':') {
            return Err(EndpointError::MultipleColons);
        }
        return Ok((host, path));
    }

    match raw.matches(':').count() {
        0 => Err(EndpointError::MissingColon),
        1 => raw.split_once(':').ok_or(EndpointError::MissingColon),
        _ => Err(EndpointError::MultipleColons),
    }
}

fn classify_host(host: &str) -> Result<HostKind, EndpointError> {
    if host.is_empty() {
        return Err(EndpointError::EmptyHost);
    }

    if let Some(inner) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        return inner
            .parse::<Ipv6Addr>()
            .map(HostKind::Ipv6)
            .map_err(|_| EndpointError::InvalidHost(host.to_string()));
    }

    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(HostKind::Ipv4(addr));
    }

    let name = host.strip_suffix('.').unwrap_or(host);
    // An all-numeric last label is a mistyped address, not a name.
    let numeric_tld = name
        .rsplit('.')
        .next()
        .is_some_and(|label| label.chars().all(|c| c.is_ascii_digit()));

    if name.len() > MAX_DNS_NAME_LEN || numeric_tld || !DNS_NAME.is_match(host) {
        return Err(EndpointError::InvalidHost(host.to_string()));
    }
    Ok(HostKind::Dns)
}
