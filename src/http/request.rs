//! Preparing requests for a backend.
//!
//! # Responsibilities
//! - Keep the public Host (HTTP/2 carries it in the URI authority)
//! - Propagate the request id
//! - Record the client address in X-Forwarded-For

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, request::Parts, HeaderValue, Request};

use crate::routing::stage::{RequestContext, X_REQUEST_ID};
use crate::security::headers::append_forwarded_for;

/// Rebuild the client request with forwarding headers applied.
pub fn upstream_request(
    mut parts: Parts,
    body: Body,
    ctx: &RequestContext,
    peer: Option<SocketAddr>,
) -> Request<Body> {
    if !parts.headers.contains_key(header::HOST) {
        if let Some(value) = ctx.host.as_deref().and_then(|h| HeaderValue::from_str(h).ok()) {
            parts.headers.insert(header::HOST, value);
        }
    }
    if let Some(value) = ctx
        .request_id
        .as_deref()
        .and_then(|id| HeaderValue::from_str(id).ok())
    {
        parts.headers.insert(X_REQUEST_ID, value);
    }
    if let Some(peer) = peer {
        append_forwarded_for(&mut parts.headers, peer.ip());
    }
    Request::from_parts(parts, body)
}
