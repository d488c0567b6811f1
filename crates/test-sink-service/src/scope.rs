//! Per-invocation composition of observability and feature bucketing.

use feature_bucketing::{DecisionRecorder, FeatureFlagContext, FeatureFlagRegistry};
use lambda_runtime::Context as LambdaContext;
use opentelemetry_semantic_conventions::attribute::{
    CLOUD_PROVIDER, FAAS_INVOCATION_ID, FAAS_NAME, FAAS_VERSION,
};
use request_observability::{Metadata, ObservabilityWrapper, Tracer};
use serde_json::Value;
use std::sync::Arc;

/// Flag selecting the strict-sequence strategy for the pair of independent
/// side effects in the record-results handler.
pub const SEQUENTIAL_SIDE_EFFECTS: &str = "sequential_side_effects";

/// The features this service declares.
pub const FEATURES: &[&str] = &[SEQUENTIAL_SIDE_EFFECTS];

/// Everything a handler needs for one invocation: an observability wrapper
/// carrying the invocation's FaaS metadata, and a fresh feature flag context.
///
/// Built once per request and dropped when the request completes.
pub struct RequestScope {
    /// Trace/span lifecycle wrapper for this invocation.
    pub observability: ObservabilityWrapper,
    /// Memoized feature flag decisions for this invocation.
    pub features: FeatureFlagContext,
}

impl RequestScope {
    /// Assembles a scope for one invocation.
    pub fn new(
        lambda_ctx: &LambdaContext,
        tracer: Arc<dyn Tracer>,
        flags: &FeatureFlagRegistry,
    ) -> Self {
        Self {
            observability: ObservabilityWrapper::new(tracer, invocation_metadata(lambda_ctx)),
            features: flags.new_context(),
        }
    }
}

/// Records feature flag decisions as both a structured log line and a
/// `feature_flags.<name>` field on the current trace context.
pub struct TracerDecisionRecorder {
    tracer: Arc<dyn Tracer>,
}

impl TracerDecisionRecorder {
    /// Creates a recorder writing through `tracer`.
    pub fn new(tracer: Arc<dyn Tracer>) -> Self {
        Self { tracer }
    }
}

impl DecisionRecorder for TracerDecisionRecorder {
    fn record(&self, feature: &str, decision: bool) {
        tracing::info!(target: "feature_flags", feature, decision, "feature flag decision");

        let mut fields = Metadata::new();
        fields.insert(format!("feature_flags.{feature}"), Value::Bool(decision));
        self.tracer.add_context(fields);
    }
}

fn invocation_metadata(ctx: &LambdaContext) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(CLOUD_PROVIDER.to_string(), Value::String("aws".to_string()));
    metadata.insert(
        FAAS_NAME.to_string(),
        Value::String(ctx.env_config.function_name.clone()),
    );
    metadata.insert(
        FAAS_VERSION.to_string(),
        Value::String(ctx.env_config.version.clone()),
    );
    metadata.insert(
        FAAS_INVOCATION_ID.to_string(),
        Value::String(ctx.request_id.clone()),
    );
    metadata
}
