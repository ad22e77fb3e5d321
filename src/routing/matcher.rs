//! Request matching predicates used by pipeline stages.
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110)
//! - Path matching is case-sensitive and never looks at the query
//! - No regex, every check is a string comparison

/// Matches the Host header (or URI authority for HTTP/2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }

    pub fn matches(&self, host: Option<&str>) -> bool {
        host.map(|h| h.eq_ignore_ascii_case(&self.expected_host))
            .unwrap_or(false)
    }
}

/// Matches one exact path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactPathMatcher {
    path: &'static str,
}

impl ExactPathMatcher {
    pub const fn new(path: &'static str) -> Self {
        Self { path }
    }

    pub fn matches(&self, path: &str) -> bool {
        path == self.path
    }
}

/// Matches a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: &'static str,
}

impl PathPrefixMatcher {
    pub const fn new(prefix: &'static str) -> Self {
        Self { prefix }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(self.prefix)
    }
}
