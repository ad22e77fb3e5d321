//! Locally generated responses.
//!
//! # Responsibilities
//! - Render the health status payload
//! - Map rejected or failed requests to status codes
//! - Decorate forwarded responses (request id, HSTS)

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::health::{HealthSnapshot, ProbeStatus};
use crate::routing::stage::{RequestContext, X_REQUEST_ID};
use crate::security::headers::apply_strict_transport;

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    dependencies: Vec<DependencyReport>,
}

#[derive(Debug, Serialize)]
struct DependencyReport {
    origin: String,
    status: ProbeStatus,
}

/// 200 with `"ok"` when every dependency is healthy, 503 otherwise.
pub fn health_status(snapshot: &HealthSnapshot) -> Response {
    let healthy = snapshot.is_healthy();
    let report = HealthReport {
        status: if healthy { "ok" } else { "unhealthy" },
        dependencies: snapshot
            .dependencies
            .iter()
            .map(|d| DependencyReport {
                origin: d.origin.to_string(),
                status: d.status,
            })
            .collect(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let mut response = (status, Json(report)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// 413 that also closes the client connection.
pub fn payload_too_large(limit: usize) -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        [(header::CONNECTION, "close")],
        format!("Request body exceeds {} bytes", limit),
    )
        .into_response()
}

pub fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "Malformed request body").into_response()
}

pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
}

/// Apply the annotations stages left on `ctx`.
pub fn finish(ctx: &RequestContext, response: &mut Response) {
    if let Some(id) = ctx.request_id.as_deref() {
        if let Ok(value) = HeaderValue::from_str(id) {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
    }
    if ctx.strict_transport {
        apply_strict_transport(response.headers_mut());
    }
}
