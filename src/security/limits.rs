//! Request body limits.
//!
//! # Responsibilities
//! - Read request bodies up to the configured limit before forwarding
//! - Tell oversized bodies apart from broken uploads
//!
//! # Design Decisions
//! - Declared Content-Length is checked earlier by the pipeline; this
//!   catches chunked bodies that cross the limit
//! - Nothing is sent to a backend until the whole body fits

use axum::body::{Body, Bytes};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("failed to read request body: {0}")]
    Read(String),
}

/// Collect `body`, failing once more than `limit` bytes arrive.
pub async fn read_limited(body: Body, limit: usize) -> Result<Bytes, BodyError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(BodyError::TooLarge { limit }),
        Err(e) => Err(BodyError::Read(e.to_string())),
    }
}
