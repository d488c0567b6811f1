//! Instrumented request handlers for the test results sink.
//!
//! Two operations, both wrapped in a trace continued from any inbound
//! `traceparent` header:
//!
//! - `create`: registers a new test run and responds with its links
//! - `record_results`: patches the run with a completion timestamp and
//!   archives the raw results payload, driving the two independent side
//!   effects with a strategy picked per request by a feature flag

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::scope::{RequestScope, TracerDecisionRecorder, FEATURES, SEQUENTIAL_SIDE_EFFECTS};
use crate::storage::{BlobStore, RecordStore, TestRunRecord};
use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use aws_lambda_events::encodings::Body;
use chrono::Utc;
use feature_bucketing::{FeatureFlagConfig, FeatureFlagRegistry};
use futures::future::BoxFuture;
use http::header::{HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, LOCATION};
use lambda_runtime::LambdaEvent;
use opentelemetry_semantic_conventions::attribute::USER_AGENT_ORIGINAL;
use request_observability::{
    decode_traceparent, metadata, run_all, ConcurrencyStrategy, Metadata, ObservabilityWrapper,
    PropagationContext, Tracer,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// The test results sink, holding its collaborators for the process lifetime.
///
/// Per-request state (trace, flag decisions) lives in a [`RequestScope`]
/// assembled at the top of each handler; this struct itself is immutable
/// after construction.
pub struct TestSinkService {
    config: ServiceConfig,
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    tracer: Arc<dyn Tracer>,
    flags: FeatureFlagRegistry,
}

impl TestSinkService {
    /// Creates the service with the default flag configuration: a uniform
    /// random source, and decisions recorded onto the current trace context.
    pub fn new(
        config: ServiceConfig,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        tracer: Arc<dyn Tracer>,
    ) -> Self {
        let flags = FeatureFlagRegistry::with_config(
            FEATURES.iter().copied(),
            FeatureFlagConfig::default()
                .with_recorder(Arc::new(TracerDecisionRecorder::new(Arc::clone(&tracer)))),
        );
        Self::with_flags(config, records, blobs, tracer, flags)
    }

    /// Creates the service with an explicit flag registry, for deterministic
    /// bucketing in tests.
    pub fn with_flags(
        config: ServiceConfig,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        tracer: Arc<dyn Tracer>,
        flags: FeatureFlagRegistry,
    ) -> Self {
        Self {
            config,
            records,
            blobs,
            tracer,
            flags,
        }
    }

    /// Routes an invocation to the matching handler.
    ///
    /// Requests carrying a `testRunId` path parameter record results for an
    /// existing run; everything else creates a new run.
    pub async fn handle(
        &self,
        event: LambdaEvent<ApiGatewayProxyRequest>,
    ) -> Result<ApiGatewayProxyResponse> {
        if event.payload.path_parameters.contains_key("testRunId") {
            self.record_results(event).await
        } else {
            self.create(event).await
        }
    }

    /// Registers a new test run.
    ///
    /// Generates the run identifier, attaches it (and the caller's raw user
    /// agent) as trace context, inserts the run record inside its own span,
    /// and responds 201 with a `Location` header and HAL-style links.
    pub async fn create(
        &self,
        event: LambdaEvent<ApiGatewayProxyRequest>,
    ) -> Result<ApiGatewayProxyResponse> {
        let (request, lambda_ctx) = event.into_parts();
        let scope = RequestScope::new(&lambda_ctx, Arc::clone(&self.tracer), &self.flags);
        let propagation = propagation_from_headers(&request.headers);
        let observability = scope.observability.clone();

        scope
            .observability
            .with_trace(
                metadata(json!({ "name": "test_run.create" })),
                propagation,
                || async move {
                    let test_run_id = Uuid::new_v4().to_string();
                    let created_at = Utc::now().to_rfc3339();

                    let mut fields = Metadata::new();
                    fields.insert(
                        "test_run_id".to_string(),
                        Value::String(test_run_id.clone()),
                    );
                    if let Some(user_agent) = request.request_context.identity.user_agent.as_deref()
                    {
                        fields.insert(
                            USER_AGENT_ORIGINAL.to_string(),
                            Value::String(user_agent.to_string()),
                        );
                    }
                    observability.add_context(fields);

                    let record = TestRunRecord {
                        test_result_id: test_run_id.clone(),
                        created_at,
                        completed_at: None,
                    };
                    observability
                        .with_span(
                            metadata(json!({
                                "name": "record_store.insert_run",
                                "table": self.config.results_table,
                            })),
                            || async move {
                                self.records.insert_run(record).await?;
                                Ok::<_, ServiceError>(())
                            },
                        )
                        .await?;

                    let base_url = request
                        .request_context
                        .path
                        .clone()
                        .unwrap_or_else(|| "/test-runs".to_string());
                    let run_url = format!("{base_url}/{test_run_id}");
                    let results_url = format!("{run_url}/results");

                    let links = json!({
                        "_links": {
                            "self": { "href": run_url },
                            "results": { "href": results_url },
                        }
                    });

                    let mut headers = self.cors_headers()?;
                    headers.insert(LOCATION, HeaderValue::from_str(&run_url)?);
                    headers.insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static("application/json;charset=utf-8"),
                    );

                    Ok(ApiGatewayProxyResponse {
                        status_code: 201,
                        headers,
                        body: Some(Body::Text(serde_json::to_string(&links)?)),
                        ..Default::default()
                    })
                },
            )
            .await
    }

    /// Records the results of an existing test run.
    ///
    /// Drives two independent side effects - patching the run record with a
    /// completion timestamp, and archiving the raw payload to the blob store
    /// - either strictly in sequence or concurrently, selected per request
    /// by the `sequential_side_effects` flag. Both side effects get their
    /// own span; neither is left in flight when the trace closes.
    pub async fn record_results(
        &self,
        event: LambdaEvent<ApiGatewayProxyRequest>,
    ) -> Result<ApiGatewayProxyResponse> {
        let (request, lambda_ctx) = event.into_parts();
        let scope = RequestScope::new(&lambda_ctx, Arc::clone(&self.tracer), &self.flags);
        let propagation = propagation_from_headers(&request.headers);
        let observability = scope.observability.clone();
        let features = scope.features;

        scope
            .observability
            .with_trace(
                metadata(json!({ "name": "test_run.record_results" })),
                propagation,
                || async move {
                    let test_run_id =
                        request.path_parameters.get("testRunId").cloned().ok_or_else(|| {
                            ServiceError::InvalidRequest(
                                "missing testRunId path parameter".to_string(),
                            )
                        })?;
                    let completed_at = Utc::now().to_rfc3339();
                    let results = request.body.clone().unwrap_or_default();

                    observability.add_field("test_run_id", test_run_id.clone());

                    let strategy =
                        ConcurrencyStrategy::from_flag(features.decide(SEQUENTIAL_SIDE_EFFECTS));

                    let operations: Vec<BoxFuture<'_, Result<()>>> = vec![
                        Box::pin(self.record_completion(
                            &observability,
                            &test_run_id,
                            &completed_at,
                        )),
                        Box::pin(self.write_results(&observability, &test_run_id, results)),
                    ];
                    run_all(strategy, operations).await?;

                    Ok(ApiGatewayProxyResponse {
                        status_code: 201,
                        headers: self.cors_headers()?,
                        ..Default::default()
                    })
                },
            )
            .await
    }

    async fn record_completion(
        &self,
        observability: &ObservabilityWrapper,
        run_id: &str,
        completed_at: &str,
    ) -> Result<()> {
        observability
            .with_span(
                metadata(json!({
                    "name": "record_store.mark_completed",
                    "table": self.config.results_table,
                })),
                || async move {
                    self.records.mark_completed(run_id, completed_at).await?;
                    Ok(())
                },
            )
            .await
    }

    async fn write_results(
        &self,
        observability: &ObservabilityWrapper,
        run_id: &str,
        results: String,
    ) -> Result<()> {
        let key = format!("test-results/{run_id}");
        observability
            .with_span(
                metadata(json!({
                    "name": "blob_store.put_object",
                    "bucket": self.config.lake_bucket,
                    "key": key.clone(),
                })),
                || async move {
                    self.blobs.put_object(&key, results.into_bytes()).await?;
                    Ok(())
                },
            )
            .await
    }

    fn cors_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_str(&self.config.cors_allow_origin)?,
        );
        Ok(headers)
    }
}

fn propagation_from_headers(headers: &HeaderMap) -> PropagationContext {
    decode_traceparent(headers.get("traceparent").and_then(|value| value.to_str().ok()))
}
