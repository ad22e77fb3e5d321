//! Pipeline stages.
//!
//! Each stage inspects a [`RequestContext`] and either claims the request
//! (returning the [`Disposition`] the server must execute) or declines.
//! Stages that never claim may still annotate the context, e.g. with the
//! request id or the HSTS flag.

use axum::http::{header, request::Parts, HeaderMap, Method, Uri};
use uuid::Uuid;

use crate::routing::api::ApiRoutes;
use crate::routing::backends::Backend;
use crate::routing::matcher::{ExactPathMatcher, HostMatcher};
use crate::routing::origin::Origin;

/// Status route probed by load balancers and orchestrators.
pub const DEFAULT_HEALTH_PATH: &str = "/__heartbeat__";
/// Path served by the verification service.
pub const VERIFY_PATH: &str = "/verify";
/// Test-only verification shortcut.
pub const FAKE_VERIFICATION_PATH: &str = "/wsapi/fake_verification";
/// Page whose visits count as a user entering the sign-in flow.
pub const SIGN_IN_PATH: &str = "/sign_in";

/// The request id header, kept from the client when present.
pub const X_REQUEST_ID: &str = "x-request-id";

/// `strict-transport-security` value sent over secure deployments.
pub const HSTS_VALUE: &str = "max-age=10886400; includeSubDomains";

/// What the router does with a request. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Reply locally with the current health snapshot.
    HealthStatus,
    /// Refuse the request body and close the connection.
    RejectOversized { limit: usize },
    /// Forward to `origin`, keeping method and path.
    Forward { backend: Backend, origin: Origin },
}

/// Result of running one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Claimed(Disposition),
    NotClaimed,
}

/// Identifies a stage, for ordering checks and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    HealthCheck,
    AccessLog,
    BodyLimit,
    StrictTransport,
    Verification,
    FakeVerification,
    Api,
    CatchAll,
}

/// Routing-relevant view of a request plus annotations left by stages.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub host: Option<String>,
    pub content_length: Option<u64>,
    incoming_request_id: Option<String>,

    /// Set by the access-log stage.
    pub request_id: Option<String>,
    /// Set by the body-limit stage; bounds the body read before forwarding.
    pub body_limit: Option<usize>,
    /// Set by the strict-transport stage.
    pub strict_transport: bool,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(&parts.method, &parts.uri, &parts.headers)
    }

    pub fn new(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()));

        let content_length = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let incoming_request_id = headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Self {
            method: method.clone(),
            path: uri.path().to_string(),
            host,
            content_length,
            incoming_request_id,
            request_id: None,
            body_limit: None,
            strict_transport: false,
        }
    }
}

/// A stage of the classification pipeline.
#[derive(Debug, Clone)]
pub enum Stage {
    HealthCheck { path: String },
    AccessLog,
    BodyLimit { max_bytes: usize },
    StrictTransport,
    Verification {
        origin: Origin,
        host: Option<HostMatcher>,
    },
    FakeVerification { origin: Origin },
    Api(ApiRoutes),
}

const VERIFY: ExactPathMatcher = ExactPathMatcher::new(VERIFY_PATH);
const FAKE_VERIFICATION: ExactPathMatcher = ExactPathMatcher::new(FAKE_VERIFICATION_PATH);

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::HealthCheck { .. } => StageKind::HealthCheck,
            Stage::AccessLog => StageKind::AccessLog,
            Stage::BodyLimit { .. } => StageKind::BodyLimit,
            Stage::StrictTransport => StageKind::StrictTransport,
            Stage::Verification { .. } => StageKind::Verification,
            Stage::FakeVerification { .. } => StageKind::FakeVerification,
            Stage::Api(_) => StageKind::Api,
        }
    }

    pub fn try_handle(&self, ctx: &mut RequestContext) -> StageOutcome {
        match self {
            Stage::HealthCheck { path } => {
                if ctx.path == *path {
                    return StageOutcome::Claimed(Disposition::HealthStatus);
                }
                StageOutcome::NotClaimed
            }
            Stage::AccessLog => {
                let request_id = ctx
                    .incoming_request_id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                tracing::info!(
                    request_id = %request_id,
                    method = %ctx.method,
                    path = %ctx.path,
                    host = ctx.host.as_deref().unwrap_or("-"),
                    "Request"
                );
                ctx.request_id = Some(request_id);
                StageOutcome::NotClaimed
            }
            Stage::BodyLimit { max_bytes } => {
                if let Some(len) = ctx.content_length {
                    if len > *max_bytes as u64 {
                        tracing::warn!(
                            request_id = ctx.request_id.as_deref().unwrap_or("-"),
                            content_length = len,
                            limit = max_bytes,
                            "Request body too large"
                        );
                        return StageOutcome::Claimed(Disposition::RejectOversized {
                            limit: *max_bytes,
                        });
                    }
                }
                ctx.body_limit = Some(*max_bytes);
                StageOutcome::NotClaimed
            }
            Stage::StrictTransport => {
                ctx.strict_transport = true;
                StageOutcome::NotClaimed
            }
            Stage::Verification { origin, host } => {
                let by_host = host
                    .as_ref()
                    .map(|m| m.matches(ctx.host.as_deref()))
                    .unwrap_or(false);
                if VERIFY.matches(&ctx.path) || by_host {
                    return StageOutcome::Claimed(Disposition::Forward {
                        backend: Backend::Verifier,
                        origin: origin.clone(),
                    });
                }
                StageOutcome::NotClaimed
            }
            Stage::FakeVerification { origin } => {
                if FAKE_VERIFICATION.matches(&ctx.path) {
                    return StageOutcome::Claimed(Disposition::Forward {
                        backend: Backend::Identity,
                        origin: origin.clone(),
                    });
                }
                StageOutcome::NotClaimed
            }
            Stage::Api(routes) => match routes.select(&ctx.method, &ctx.path) {
                Some((backend, origin)) => StageOutcome::Claimed(Disposition::Forward {
                    backend,
                    origin: origin.clone(),
                }),
                None => StageOutcome::NotClaimed,
            },
        }
    }
}
