//! Pipeline assembly and classification.
//!
//! # Design Decisions
//! - Stage list is built once from `Settings`, immutable at runtime
//! - Optional stages are left out of the list instead of being disabled
//!   inside it, so an inactive stage can never claim
//! - The catch-all is a separate field: it always runs last and always
//!   claims, so every request gets exactly one disposition

use std::sync::Arc;

use crate::config::Settings;
use crate::observability::metrics::{MetricsTap, RouterEvent};
use crate::routing::api::ApiRoutes;
use crate::routing::backends::Backend;
use crate::routing::matcher::{ExactPathMatcher, HostMatcher};
use crate::routing::origin::Origin;
use crate::routing::stage::{
    Disposition, RequestContext, Stage, StageKind, StageOutcome, SIGN_IN_PATH,
};

const SIGN_IN: ExactPathMatcher = ExactPathMatcher::new(SIGN_IN_PATH);

/// Final stage: forwards anything unclaimed to the static-asset service.
pub struct CatchAll {
    origin: Origin,
    tap: Arc<dyn MetricsTap>,
}

impl CatchAll {
    fn handle(&self, ctx: &RequestContext) -> Disposition {
        if SIGN_IN.matches(&ctx.path) {
            self.tap.fire(RouterEvent::UserEntry);
        }
        Disposition::Forward {
            backend: Backend::Static,
            origin: self.origin.clone(),
        }
    }
}

/// Outcome of classifying one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Stage that claimed the request.
    pub claimed_by: StageKind,
    pub disposition: Disposition,
}

/// The ordered classification pipeline.
pub struct Pipeline {
    stages: Vec<Stage>,
    catch_all: CatchAll,
}

impl Pipeline {
    /// Assemble the stage list for a validated configuration.
    pub fn from_settings(settings: &Settings, tap: Arc<dyn MetricsTap>) -> Self {
        let backends = &settings.backends;
        let mut stages = vec![
            Stage::HealthCheck {
                path: settings.health.path.clone(),
            },
            Stage::AccessLog,
            Stage::BodyLimit {
                max_bytes: settings.max_body_size,
            },
        ];

        if settings.public.secure_transport() {
            stages.push(Stage::StrictTransport);
        }

        if let Some(verifier) = &backends.verifier {
            stages.push(Stage::Verification {
                origin: verifier.clone(),
                host: settings
                    .public
                    .verification_host
                    .as_deref()
                    .map(HostMatcher::new),
            });
        }

        if settings.test_mode {
            tracing::warn!("Test mode enabled: fake verification route is active");
            stages.push(Stage::FakeVerification {
                origin: backends.identity.clone(),
            });
        }

        stages.push(Stage::Api(ApiRoutes::new(
            backends.identity.clone(),
            backends.writer.clone(),
        )));

        let pipeline = Self {
            stages,
            catch_all: CatchAll {
                origin: backends.static_assets.clone(),
                tap,
            },
        };
        tracing::debug!(stages = ?pipeline.kinds(), "Pipeline assembled");
        pipeline
    }

    /// Stage kinds in execution order, catch-all included.
    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages
            .iter()
            .map(Stage::kind)
            .chain(std::iter::once(StageKind::CatchAll))
            .collect()
    }

    /// Run the stages in order until one claims the request.
    pub fn classify(&self, ctx: &mut RequestContext) -> Classification {
        for stage in &self.stages {
            if let StageOutcome::Claimed(disposition) = stage.try_handle(ctx) {
                return Classification {
                    claimed_by: stage.kind(),
                    disposition,
                };
            }
        }
        Classification {
            claimed_by: StageKind::CatchAll,
            disposition: self.catch_all.handle(ctx),
        }
    }
}
