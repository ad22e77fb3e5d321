//! API namespace sub-router.
//!
//! Everything under `/wsapi/` belongs to the identity service's web API.
//! Reads are served by the identity service directly, mutations go through
//! the write-coordination service.

use axum::http::Method;

use crate::routing::backends::Backend;
use crate::routing::matcher::PathPrefixMatcher;
use crate::routing::origin::Origin;

/// Path prefix of the web API.
pub const API_PREFIX: &str = "/wsapi/";

const API: PathPrefixMatcher = PathPrefixMatcher::new(API_PREFIX);

/// Read/write split for the API namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoutes {
    read: Origin,
    write: Origin,
}

impl ApiRoutes {
    pub fn new(read: Origin, write: Origin) -> Self {
        Self { read, write }
    }

    /// Pick the backend for an API request, or `None` outside the namespace.
    pub fn select(&self, method: &Method, path: &str) -> Option<(Backend, &Origin)> {
        if !API.matches(path) {
            return None;
        }
        if is_read(method) {
            Some((Backend::Identity, &self.read))
        } else {
            Some((Backend::Writer, &self.write))
        }
    }
}

fn is_read(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
