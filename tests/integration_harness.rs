//! Integration test harness that runs all three crates together:
//! - feature-bucketing (per-request decisions)
//! - request-observability (trace/span lifecycle, propagation)
//! - test-sink-service (handlers against in-memory stores)
//!
//! This exercises a full request lifecycle: an upstream caller with an
//! existing trace creates a run, then posts its results, with the bucketing
//! flag steering the concurrency strategy.

use aws_lambda_events::apigw::ApiGatewayProxyRequest;
use feature_bucketing::{DecisionRecorder, FeatureFlagConfig, FeatureFlagRegistry};
use http::header::HeaderValue;
use lambda_runtime::{Context as LambdaContext, LambdaEvent};
use request_observability::testing::{RecordingTracer, TracerCall};
use std::sync::{Arc, Mutex};
use test_sink_service::storage::{InMemoryBlobStore, InMemoryRecordStore};
use test_sink_service::{ServiceConfig, TestSinkService, SEQUENTIAL_SIDE_EFFECTS};

const UPSTREAM_TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

#[derive(Default)]
struct CountingRecorder {
    queries: Mutex<Vec<(String, bool)>>,
}

impl DecisionRecorder for CountingRecorder {
    fn record(&self, feature: &str, decision: bool) {
        self.queries
            .lock()
            .unwrap()
            .push((feature.to_string(), decision));
    }
}

struct World {
    service: TestSinkService,
    records: Arc<InMemoryRecordStore>,
    blobs: Arc<InMemoryBlobStore>,
    tracer: RecordingTracer,
    recorder: Arc<CountingRecorder>,
}

fn world(sequential: bool) -> World {
    let records = Arc::new(InMemoryRecordStore::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let tracer = RecordingTracer::new();
    let recorder = Arc::new(CountingRecorder::default());

    let flags = FeatureFlagRegistry::with_config(
        [SEQUENTIAL_SIDE_EFFECTS],
        FeatureFlagConfig::default()
            .with_decision_source(Box::new(move || sequential))
            .with_recorder(recorder.clone()),
    );

    let service = TestSinkService::with_flags(
        ServiceConfig::default(),
        records.clone(),
        blobs.clone(),
        Arc::new(tracer.clone()),
        flags,
    );

    World {
        service,
        records,
        blobs,
        tracer,
        recorder,
    }
}

fn create_event(traceparent: Option<&'static str>) -> LambdaEvent<ApiGatewayProxyRequest> {
    let mut request = ApiGatewayProxyRequest::default();
    request.path = Some("/test-runs".to_string());
    request.request_context.path = Some("/test-runs".to_string());
    request.request_context.identity.user_agent = Some("harness-agent/2.0".to_string());
    if let Some(header) = traceparent {
        request
            .headers
            .insert("traceparent", HeaderValue::from_static(header));
    }
    LambdaEvent::new(request, LambdaContext::default())
}

fn results_event(run_id: &str, payload: &str) -> LambdaEvent<ApiGatewayProxyRequest> {
    let mut request = ApiGatewayProxyRequest::default();
    request
        .path_parameters
        .insert("testRunId".to_string(), run_id.to_string());
    request.body = Some(payload.to_string());
    LambdaEvent::new(request, LambdaContext::default())
}

fn created_run_id(response: &aws_lambda_events::apigw::ApiGatewayProxyResponse) -> String {
    response
        .headers
        .get("location")
        .expect("Location header missing")
        .to_str()
        .unwrap()
        .rsplit('/')
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn full_lifecycle_with_inherited_trace() {
    let w = world(true);

    // An upstream caller creates a run, continuing its own trace.
    let created = w
        .service
        .handle(create_event(Some(UPSTREAM_TRACEPARENT)))
        .await
        .unwrap();
    assert_eq!(created.status_code, 201);
    let run_id = created_run_id(&created);

    // It then posts the results.
    let recorded = w
        .service
        .handle(results_event(&run_id, "suite passed: 42 green"))
        .await
        .unwrap();
    assert_eq!(recorded.status_code, 201);

    // Durable state is complete.
    let record = w.records.get(&run_id).unwrap();
    assert!(record.completed_at.is_some());
    assert_eq!(
        w.blobs.get(&format!("test-results/{run_id}")).unwrap(),
        b"suite passed: 42 green"
    );

    // The first trace continued the upstream trace; the second started fresh.
    let starts: Vec<_> = w
        .tracer
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            TracerCall::StartTrace { propagation, .. } => Some(propagation),
            _ => None,
        })
        .collect();
    assert_eq!(starts.len(), 2);
    assert_eq!(
        starts[0].trace_id.as_deref(),
        Some("4bf92f3577b34da6a3ce929d0e0e4736")
    );
    assert!(starts[1].is_empty());

    // Every opened trace/span was closed: 2 traces + 3 spans.
    assert_eq!(w.tracer.opened(), 5);
    assert_eq!(w.tracer.closed(), 5);

    // The flag was consulted once, during record_results, and the decision
    // was reported.
    let queries = w.recorder.queries.lock().unwrap().clone();
    assert_eq!(
        queries,
        vec![(SEQUENTIAL_SIDE_EFFECTS.to_string(), true)]
    );
}

#[tokio::test]
async fn concurrent_strategy_produces_the_same_durable_state() {
    let sequential = world(true);
    let concurrent = world(false);

    for w in [&sequential, &concurrent] {
        let created = w.service.handle(create_event(None)).await.unwrap();
        let run_id = created_run_id(&created);
        w.service
            .handle(results_event(&run_id, "payload"))
            .await
            .unwrap();

        let record = w.records.get(&run_id).unwrap();
        assert!(record.completed_at.is_some());
        assert!(w.blobs.get(&format!("test-results/{run_id}")).is_some());
        assert_eq!(w.tracer.opened(), w.tracer.closed());
    }
}

#[tokio::test]
async fn flag_decisions_are_stable_within_a_request_but_redrawn_across_requests() {
    // An alternating source: first request sees `true`, second sees `false`.
    let state = Arc::new(Mutex::new(true));
    let source_state = state.clone();
    let recorder = Arc::new(CountingRecorder::default());

    let flags = FeatureFlagRegistry::with_config(
        [SEQUENTIAL_SIDE_EFFECTS],
        FeatureFlagConfig::default()
            .with_decision_source(Box::new(move || {
                let mut state = source_state.lock().unwrap();
                let value = *state;
                *state = !value;
                value
            }))
            .with_recorder(recorder.clone()),
    );

    let records = Arc::new(InMemoryRecordStore::new());
    let service = TestSinkService::with_flags(
        ServiceConfig::default(),
        records.clone(),
        Arc::new(InMemoryBlobStore::new()),
        Arc::new(RecordingTracer::new()),
        flags,
    );

    // Each request builds one flag context, so each request consumes exactly
    // one draw from the source.
    for (run_id, expected) in [("run-a", true), ("run-b", false)] {
        use test_sink_service::storage::{RecordStore, TestRunRecord};
        records
            .insert_run(TestRunRecord {
                test_result_id: run_id.to_string(),
                created_at: "2026-08-24T00:00:00+00:00".to_string(),
                completed_at: None,
            })
            .await
            .unwrap();

        service
            .handle(results_event(run_id, "payload"))
            .await
            .unwrap();

        let last_query = recorder.queries.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last_query, (SEQUENTIAL_SIDE_EFFECTS.to_string(), expected));
    }
}
