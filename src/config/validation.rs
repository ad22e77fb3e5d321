//! Configuration validation.
//!
//! # Responsibilities
//! - Resolve every backend URL into an origin
//! - Derive the public verification host
//! - Validate value ranges (intervals > 0, limits > 0, paths absolute)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: &RouterConfig → Result<Settings, ConfigError>
//! - Runs before a listener is bound; any error is fatal

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::config::schema::RouterConfig;
use crate::config::settings::Settings;
use crate::routing::backends::{BackendSet, PublicHosts};
use crate::routing::origin::{host_header_for, resolve, Origin, OriginError};

/// A single semantic problem in the configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: {source}")]
    Origin {
        field: &'static str,
        #[source]
        source: OriginError,
    },
    #[error("{field}: backends must use plain http, got {origin}")]
    BackendScheme { field: &'static str, origin: String },
    #[error("listener.bind_address: invalid socket address {0:?}")]
    BindAddress(String),
    #[error("observability.metrics_address: invalid socket address {0:?}")]
    MetricsAddress(String),
    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field}: path must start with '/', got {path:?}")]
    Path { field: &'static str, path: String },
    #[error("public.verifier_url is set but backends.verifier_url is not")]
    VerifierHostWithoutBackend,
}

/// Check `config` and turn it into runtime [`Settings`].
pub fn validate_config(config: &RouterConfig) -> Result<Settings, ConfigError> {
    let mut errors = Vec::new();

    let bind_address = match config.listener.bind_address.parse::<SocketAddr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
            None
        }
    };

    let metrics_address = if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => Some(addr),
            Err(_) => {
                errors.push(ValidationError::MetricsAddress(
                    config.observability.metrics_address.clone(),
                ));
                None
            }
        }
    } else {
        None
    };

    let b = &config.backends;
    let identity = backend(&mut errors, "backends.identity_url", b.identity_url.as_deref());
    let writer = backend(&mut errors, "backends.writer_url", b.writer_url.as_deref());
    let static_assets = backend(&mut errors, "backends.static_url", b.static_url.as_deref());
    let verifier = match b.verifier_url.as_deref() {
        Some(url) => backend(&mut errors, "backends.verifier_url", Some(url)),
        None => None,
    };

    let router = origin(&mut errors, "public.url", Some(&config.public.url));
    let verification_host = config
        .public
        .verifier_url
        .as_deref()
        .and_then(|url| verification_host(&mut errors, &config.public.url, url));
    if config.public.verifier_url.is_some() && b.verifier_url.is_none() {
        errors.push(ValidationError::VerifierHostWithoutBackend);
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero { field: "security.max_body_size" });
    }
    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "health_check.interval_secs" });
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "health_check.timeout_secs" });
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.connect_secs" });
    }
    for (field, path) in [
        ("health_check.path", &config.health_check.path),
        ("health_check.probe_path", &config.health_check.probe_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError::Path { field, path: path.clone() });
        }
    }

    match (bind_address, identity, writer, static_assets, router) {
        (Some(bind_address), Some(identity), Some(writer), Some(static_assets), Some(router))
            if errors.is_empty() =>
        {
            Ok(Settings {
                bind_address,
                backends: BackendSet {
                    identity,
                    writer,
                    static_assets,
                    verifier,
                },
                public: PublicHosts {
                    router,
                    verification_host,
                },
                max_body_size: config.security.max_body_size,
                health: config.health_check.clone(),
                timeouts: config.timeouts.clone(),
                observability: config.observability.clone(),
                metrics_address,
                test_mode: config.test_mode,
            })
        }
        _ => Err(ConfigError::Validation(errors)),
    }
}

fn origin(errors: &mut Vec<ValidationError>, field: &'static str, raw: Option<&str>) -> Option<Origin> {
    match resolve(raw) {
        Ok(origin) => Some(origin),
        Err(source) => {
            errors.push(ValidationError::Origin { field, source });
            None
        }
    }
}

fn backend(errors: &mut Vec<ValidationError>, field: &'static str, raw: Option<&str>) -> Option<Origin> {
    let origin = origin(errors, field, raw)?;
    if origin.scheme() != "http" {
        errors.push(ValidationError::BackendScheme {
            field,
            origin: origin.to_string(),
        });
        return None;
    }
    Some(origin)
}

/// Host header routed to the verifier, when it differs from the router's.
fn verification_host(
    errors: &mut Vec<ValidationError>,
    public_url: &str,
    verifier_url: &str,
) -> Option<String> {
    let verifier_host = match host_header_for(verifier_url) {
        Ok(host) => host,
        Err(source) => {
            errors.push(ValidationError::Origin {
                field: "public.verifier_url",
                source,
            });
            return None;
        }
    };
    match host_header_for(public_url) {
        Ok(router_host) if router_host == verifier_host => None,
        _ => Some(verifier_host),
    }
}
