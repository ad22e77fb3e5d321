//! Forwarding requests to backend origins.
//!
//! # Responsibilities
//! - Point the request at `origin + path?query`
//! - Send it with the shared hyper client
//! - Hand the backend response back as a stream
//!
//! # Design Decisions
//! - Backend HTTP error statuses are successful forwards
//! - Transport failures are returned, never retried
//! - Dropping the returned future cancels the backend request

use std::time::Duration;

use axum::body::Body;
use axum::http::{uri::InvalidUri, Request, Response, Uri, Version};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::routing::origin::Origin;
use crate::security::headers::strip_hop_by_hop;

/// Why a forward did not produce a backend response.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream URI {uri:?}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: InvalidUri,
    },
    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
}

/// Resolves exactly once with the backend response or the failure.
pub type ForwardFuture = BoxFuture<'static, Result<Response<Body>, ForwardError>>;

/// Relays a request to an origin and its response back.
pub trait Forwarder: Send + Sync {
    fn forward(&self, origin: &Origin, request: Request<Body>) -> ForwardFuture;
}

/// Build the plain-HTTP client used for backend and probe traffic.
pub fn build_client(connect_timeout: Duration) -> Client<HttpConnector, Body> {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Target URI for `request` on `origin`, keeping path and query.
pub fn upstream_uri(origin: &Origin, uri: &Uri) -> Result<Uri, ForwardError> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let target = origin.join(path_and_query);
    target
        .parse::<Uri>()
        .map_err(|source| ForwardError::InvalidUri { uri: target, source })
}

/// [`Forwarder`] backed by the hyper-util legacy client.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
}

impl HttpForwarder {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            client: build_client(connect_timeout),
        }
    }
}

impl Forwarder for HttpForwarder {
    fn forward(&self, origin: &Origin, request: Request<Body>) -> ForwardFuture {
        let (mut parts, body) = request.into_parts();
        let uri = match upstream_uri(origin, &parts.uri) {
            Ok(uri) => uri,
            Err(e) => return Box::pin(async move { Err(e) }),
        };
        parts.uri = uri;
        // Backends speak HTTP/1.1 whatever the client negotiated.
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);

        let client = self.client.clone();
        let request = Request::from_parts(parts, body);
        Box::pin(async move {
            let response = client.request(request).await?;
            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, Body::new(body)))
        })
    }
}
