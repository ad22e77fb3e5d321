//! The fixed set of backends the router forwards to.

use std::fmt;

use crate::routing::origin::Origin;

/// Names a backend service in logs, metrics and dispositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Identity/verification service, read side.
    Identity,
    /// Write-coordination service.
    Writer,
    /// Static-asset service.
    Static,
    /// Dedicated verification service.
    Verifier,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Identity => "identity",
            Backend::Writer => "writer",
            Backend::Static => "static",
            Backend::Verifier => "verifier",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved backend origins. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSet {
    pub identity: Origin,
    pub writer: Origin,
    pub static_assets: Origin,
    pub verifier: Option<Origin>,
}

impl BackendSet {
    /// Dependencies whose liveness gates the health endpoint.
    pub fn health_dependencies(&self) -> Vec<Origin> {
        vec![self.identity.clone(), self.static_assets.clone()]
    }
}

/// Public-facing addressing derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicHosts {
    /// Public origin of the router itself.
    pub router: Origin,
    /// Host header value that routes to the verifier, when it differs
    /// from the router's own public host.
    pub verification_host: Option<String>,
}

impl PublicHosts {
    /// Responses carry HSTS only when the public scheme is https.
    pub fn secure_transport(&self) -> bool {
        self.router.is_secure()
    }
}
