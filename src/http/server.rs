//! HTTP server setup and request execution.
//!
//! # Responsibilities
//! - Create the Axum Router; every path goes through the pipeline
//! - Execute the disposition chosen by the pipeline
//! - Spawn the health monitor next to the listener
//! - Serve until the shutdown signal

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::health::{HealthMonitor, HealthState};
use crate::http::forward::{Forwarder, HttpForwarder};
use crate::http::request::upstream_request;
use crate::http::response;
use crate::lifecycle::Shutdown;
use crate::observability::metrics::{MetricsTap, PrometheusTap};
use crate::routing::stage::{Disposition, RequestContext};
use crate::routing::{Backend, Classification, Origin, Pipeline};
use crate::security::limits::{read_limited, BodyError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub health: Arc<HealthState>,
    pub forwarder: Arc<dyn Forwarder>,
}

/// HTTP server for the edge router.
pub struct HttpServer {
    router: Router,
    settings: Arc<Settings>,
    health: Arc<HealthState>,
}

impl HttpServer {
    /// Create a server forwarding over HTTP and reporting to Prometheus.
    pub fn new(settings: Settings) -> Self {
        let forwarder = Arc::new(HttpForwarder::new(Duration::from_secs(
            settings.timeouts.connect_secs,
        )));
        Self::with_parts(settings, forwarder, Arc::new(PrometheusTap))
    }

    /// Create a server with explicit forwarding and metrics collaborators.
    pub fn with_parts(
        settings: Settings,
        forwarder: Arc<dyn Forwarder>,
        tap: Arc<dyn MetricsTap>,
    ) -> Self {
        let health = Arc::new(HealthState::new(&settings.backends.health_dependencies()));
        let pipeline = Arc::new(Pipeline::from_settings(&settings, tap));

        let state = AppState {
            pipeline,
            health: health.clone(),
            forwarder,
        };

        Self {
            router: Self::build_router(state),
            settings: Arc::new(settings),
            health,
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(route_request))
            .route("/", any(route_request))
            .with_state(state)
    }

    /// The request router, for serving or driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn health(&self) -> Arc<HealthState> {
        self.health.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let mut server_shutdown = shutdown.subscribe();
        let monitor_shutdown = shutdown.subscribe();

        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let monitor = HealthMonitor::new(
            self.health.clone(),
            self.settings.health.clone(),
            Duration::from_secs(self.settings.timeouts.connect_secs),
        );
        tokio::spawn(monitor.run(monitor_shutdown));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Classify the request and carry out its single disposition.
async fn route_request(State(state): State<AppState>, request: Request<Body>) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();

    let mut ctx = RequestContext::from_parts(&parts);
    let Classification {
        claimed_by,
        disposition,
    } = state.pipeline.classify(&mut ctx);

    match disposition {
        Disposition::HealthStatus => response::health_status(&state.health.snapshot()),
        Disposition::RejectOversized { limit } => response::payload_too_large(limit),
        Disposition::Forward { backend, origin } => {
            // Rejected bodies get the same bare reply whichever check caught them.
            let body = match bounded_body(&ctx, body).await {
                Ok(body) => body,
                Err(response) => return response,
            };
            tracing::debug!(
                request_id = ctx.request_id.as_deref().unwrap_or("-"),
                stage = ?claimed_by,
                backend = %backend,
                origin = %origin,
                "Forwarding request"
            );
            let mut response = forward(&state, &ctx, parts, body, backend, &origin, peer).await;
            response::finish(&ctx, &mut response);
            response
        }
    }
}

/// Buffer the body when the body-limit stage set a bound.
async fn bounded_body(ctx: &RequestContext, body: Body) -> Result<Body, Response> {
    let Some(limit) = ctx.body_limit else {
        return Ok(body);
    };
    let request_id = ctx.request_id.as_deref().unwrap_or("-");
    match read_limited(body, limit).await {
        Ok(bytes) => Ok(Body::from(bytes)),
        Err(BodyError::TooLarge { limit }) => {
            tracing::warn!(request_id = %request_id, limit, "Request body too large");
            Err(response::payload_too_large(limit))
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request body unreadable");
            Err(response::bad_request())
        }
    }
}

async fn forward(
    state: &AppState,
    ctx: &RequestContext,
    parts: axum::http::request::Parts,
    body: Body,
    backend: Backend,
    origin: &Origin,
    peer: Option<SocketAddr>,
) -> Response {
    let request_id = ctx.request_id.as_deref().unwrap_or("-");

    let request = upstream_request(parts, body, ctx, peer);
    match state.forwarder.forward(origin, request).await {
        Ok(response) => {
            tracing::debug!(
                request_id = %request_id,
                backend = %backend,
                status = %response.status(),
                "Upstream responded"
            );
            response
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                backend = %backend,
                origin = %origin,
                error = %e,
                "Upstream error"
            );
            response::bad_gateway()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{validate_config, RouterConfig};
    use crate::health::{DependencyHealth, HealthSnapshot, ProbeStatus};
    use crate::http::forward::{ForwardError, ForwardFuture};
    use crate::observability::metrics::testing::RecordingTap;
    use crate::observability::metrics::RouterEvent;
    use axum::http::{header, HeaderMap, Method, StatusCode};
    use futures_util::stream;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Debug, Clone)]
    struct Call {
        origin: String,
        method: Method,
        uri: String,
        headers: HeaderMap,
        body: Vec<u8>,
    }

    /// Records every forward and answers 200 with the origin as body.
    #[derive(Default)]
    struct RecordingForwarder {
        calls: Arc<Mutex<Vec<Call>>>,
        fail: bool,
    }

    impl Forwarder for RecordingForwarder {
        fn forward(&self, origin: &Origin, request: Request<Body>) -> ForwardFuture {
            let calls = self.calls.clone();
            let origin = origin.to_string();
            let fail = self.fail;
            Box::pin(async move {
                let (parts, body) = request.into_parts();
                let body = body.collect().await.unwrap().to_bytes().to_vec();
                calls.lock().unwrap().push(Call {
                    origin: origin.clone(),
                    method: parts.method,
                    uri: parts.uri.to_string(),
                    headers: parts.headers,
                    body,
                });
                if fail {
                    let err = "not a uri".parse::<axum::http::Uri>().unwrap_err();
                    return Err(ForwardError::InvalidUri { uri: origin, source: err });
                }
                Ok(Response::new(Body::from(origin)))
            })
        }
    }

    struct Harness {
        server: HttpServer,
        calls: Arc<Mutex<Vec<Call>>>,
        tap: Arc<RecordingTap>,
    }

    impl Harness {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.server.router().oneshot(request).await.unwrap()
        }
    }

    fn config() -> RouterConfig {
        let mut config = RouterConfig::default();
        config.public.url = "https://example.org".into();
        config.public.verifier_url = Some("https://verify.example.org".into());
        config.backends.identity_url = Some("http://127.0.0.1:10002".into());
        config.backends.writer_url = Some("http://127.0.0.1:10004".into());
        config.backends.static_url = Some("http://127.0.0.1:10010".into());
        config.backends.verifier_url = Some("http://127.0.0.1:10000".into());
        config
    }

    fn harness_with(config: RouterConfig, fail: bool) -> Harness {
        let settings = validate_config(&config).unwrap();
        let forwarder = RecordingForwarder { fail, ..Default::default() };
        let calls = forwarder.calls.clone();
        let tap = Arc::new(RecordingTap::default());
        let server = HttpServer::with_parts(settings, Arc::new(forwarder), tap.clone());
        Harness { server, calls, tap }
    }

    fn harness() -> Harness {
        harness_with(config(), false)
    }

    fn get(uri: &str, host: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_catch_all_forwards_to_static_with_path() {
        let h = harness();
        let response = h.send(get("/include.js?v=1", "example.org")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            response.headers()[header::STRICT_TRANSPORT_SECURITY],
            "max-age=10886400; includeSubDomains"
        );
        assert_eq!(text(response).await, "http://127.0.0.1:10010");

        let calls = h.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].origin, "http://127.0.0.1:10010");
        assert_eq!(calls[0].uri, "/include.js?v=1");
        assert_eq!(calls[0].headers[header::HOST], "example.org");
        assert!(calls[0].headers.contains_key("x-request-id"));
        assert!(h.tap.events().is_empty());
    }

    #[tokio::test]
    async fn test_health_route_is_local_and_reflects_snapshot() {
        let h = harness();

        let response = h.send(get("/__heartbeat__", "verify.example.org")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().get("x-request-id").is_none());
        let body: serde_json::Value = serde_json::from_str(&text(response).await).unwrap();
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["dependencies"][0]["status"], "unknown");

        let health = h.server.health();
        let snapshot = health.snapshot();
        health.publish(HealthSnapshot {
            dependencies: snapshot
                .dependencies
                .iter()
                .map(|d| DependencyHealth { origin: d.origin.clone(), status: ProbeStatus::Healthy })
                .collect(),
            round: 1,
        });

        let response = h.send(get("/__heartbeat__", "example.org")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&text(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["dependencies"][1]["origin"], "http://127.0.0.1:10010");

        assert!(h.calls().is_empty());
    }

    #[tokio::test]
    async fn test_declared_oversized_body_never_forwarded() {
        let h = harness();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/wsapi/stage_user")
            .header(header::HOST, "example.org")
            .header(header::CONTENT_LENGTH, 20_000)
            .body(Body::from(vec![b'x'; 20_000]))
            .unwrap();
        let response = h.send(request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[header::CONNECTION], "close");
        assert!(response.headers().get(header::STRICT_TRANSPORT_SECURITY).is_none());
        assert!(response.headers().get("x-request-id").is_none());
        assert!(h.calls().is_empty());
        assert!(h.tap.events().is_empty());
    }

    #[tokio::test]
    async fn test_streamed_oversized_body_never_forwarded() {
        let h = harness();
        let chunks = stream::iter((0..4).map(|_| Ok::<_, std::io::Error>(vec![b'x'; 4096])));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/verify")
            .header(header::HOST, "example.org")
            .body(Body::from_stream(chunks))
            .unwrap();
        let response = h.send(request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[header::CONNECTION], "close");
        // Same bare reply as a declared oversized length.
        assert!(response.headers().get(header::STRICT_TRANSPORT_SECURITY).is_none());
        assert!(response.headers().get("x-request-id").is_none());
        assert!(h.calls().is_empty());
        assert!(h.tap.events().is_empty());
    }

    #[tokio::test]
    async fn test_body_and_method_preserved() {
        let h = harness();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/verify")
            .header(header::HOST, "example.org")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("assertion=abc&audience=https://rp.example"))
            .unwrap();
        let response = h.send(request).await;
        assert_eq!(text(response).await, "http://127.0.0.1:10000");

        let calls = h.calls();
        assert_eq!(calls[0].method, Method::POST);
        assert_eq!(calls[0].uri, "/verify");
        assert_eq!(calls[0].body, b"assertion=abc&audience=https://rp.example");
    }

    #[tokio::test]
    async fn test_verification_host_and_api_split() {
        let h = harness();
        let response = h.send(get("/any/path", "verify.example.org")).await;
        assert_eq!(text(response).await, "http://127.0.0.1:10000");

        let response = h.send(get("/wsapi/session_context", "example.org")).await;
        assert_eq!(text(response).await, "http://127.0.0.1:10002");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/wsapi/stage_user")
            .header(header::HOST, "example.org")
            .body(Body::from("{}"))
            .unwrap();
        let response = h.send(request).await;
        assert_eq!(text(response).await, "http://127.0.0.1:10004");

        let response = h.send(get("/other", "example.org")).await;
        assert_eq!(text(response).await, "http://127.0.0.1:10010");
        assert_eq!(h.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_sign_in_fires_user_entry_once() {
        let h = harness();
        h.send(get("/sign_in", "example.org")).await;
        h.send(get("/about", "example.org")).await;
        assert_eq!(h.tap.events(), vec![RouterEvent::UserEntry]);
    }

    #[tokio::test]
    async fn test_forward_failure_is_bad_gateway() {
        let h = harness_with(config(), true);
        let response = h.send(get("/about", "example.org")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().contains_key(header::STRICT_TRANSPORT_SECURITY));
        assert_eq!(h.calls().len(), 1);
        assert!(h.tap.events().is_empty());
    }

    #[tokio::test]
    async fn test_failed_sign_in_forward_fires_only_user_entry() {
        let h = harness_with(config(), true);
        let response = h.send(get("/sign_in", "example.org")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let response = h.send(get("/about", "example.org")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(h.tap.events(), vec![RouterEvent::UserEntry]);
    }

    #[tokio::test]
    async fn test_plain_deployment_has_no_hsts() {
        let mut config = config();
        config.public.url = "http://example.org".into();
        let h = harness_with(config, false);
        let response = h.send(get("/", "example.org")).await;
        assert!(response.headers().get(header::STRICT_TRANSPORT_SECURITY).is_none());
    }
}
