//! Origin resolution.
//!
//! # Responsibilities
//! - Parse configured backend URLs
//! - Reduce them to scheme + host + port ("origin-only")
//! - Reject absent or malformed values before the listener is bound
//!
//! # Design Decisions
//! - Path, query, fragment and credentials are dropped; stages append
//!   request paths themselves
//! - Ports are always explicit after resolution (scheme default applied)
//! - An `Origin` can only be built through `resolve`

use std::fmt;

use thiserror::Error;
use url::Url;

/// Errors produced while resolving an origin.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OriginError {
    #[error("no URL configured")]
    Missing,
    #[error("malformed URL {url:?}: {reason}")]
    Malformed { url: String, reason: String },
    #[error("unsupported scheme {scheme:?} in {url:?} (expected http or https)")]
    UnsupportedScheme { url: String, scheme: String },
    #[error("URL {url:?} has no host")]
    MissingHost { url: String },
}

/// An immutable scheme + host + port triple identifying a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: u16,
}

impl Origin {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }

    /// Full URL string for `path_and_query` on this origin.
    pub fn join(&self, path_and_query: &str) -> String {
        if path_and_query.starts_with('/') {
            format!("{}{}", self, path_and_query)
        } else {
            format!("{}/{}", self, path_and_query)
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Resolve a configured URL into an origin.
pub fn resolve(raw: Option<&str>) -> Result<Origin, OriginError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(OriginError::Missing)?;

    let url = Url::parse(raw).map_err(|e| OriginError::Malformed {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(OriginError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: scheme.to_string(),
        });
    }

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
        _ => return Err(OriginError::MissingHost { url: raw.to_string() }),
    };

    // http and https always have a known default
    let port = url.port_or_known_default().unwrap_or(if scheme == "https" { 443 } else { 80 });

    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        tracing::debug!(url = %raw, "Dropping path/query from configured origin");
    }

    Ok(Origin {
        scheme: scheme.to_string(),
        host,
        port,
    })
}

/// The `host[:port]` form a client would send in its Host header for `raw`.
///
/// Default ports are omitted, matching what browsers send.
pub fn host_header_for(raw: &str) -> Result<String, OriginError> {
    let url = Url::parse(raw.trim()).map_err(|e| OriginError::Malformed {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| OriginError::MissingHost { url: raw.to_string() })?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host.to_ascii_lowercase(), port),
        None => host.to_ascii_lowercase(),
    })
}
